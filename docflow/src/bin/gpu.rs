//! GPU stage container entry point. Reads and writes the shared mount only.

use std::process::ExitCode;
use std::sync::Arc;

use docflow::observability::{init_logging, LogFormat};
use docflow::prelude::*;
use docflow::runtime::run_to_exit;
use docflow::stages::{NvidiaProcProbe, PlaceholderModel};

fn main() -> ExitCode {
    init_logging(LogFormat::from_env_or(LogFormat::Json));

    run_to_exit("Error in GPU processing", async {
        let config = GpuConfig::from_env(&ProcessEnv)?;
        let sink = Arc::new(LoggingEventSink::default().with_component("gpu"));

        gpu::run(
            &config,
            &NvidiaProcProbe::default(),
            &PlaceholderModel,
            sink,
            Arc::new(SystemClock::new()),
        )
        .await
    })
}
