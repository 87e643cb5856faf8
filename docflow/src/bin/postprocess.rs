//! Postprocess stage container entry point.
//!
//! Requires `OUTPUT_BUCKET` and `OUTPUT_PREFIX`.

use std::process::ExitCode;
use std::sync::Arc;

use docflow::observability::{init_logging, LogFormat};
use docflow::prelude::*;
use docflow::runtime::run_to_exit;

fn main() -> ExitCode {
    init_logging(LogFormat::from_env_or(LogFormat::Json));

    run_to_exit("Error in postprocessing", async {
        let config = PostprocessConfig::from_env(&ProcessEnv)?;
        let gateway = ObjectStoreGateway::s3();
        let sink = Arc::new(LoggingEventSink::default().with_component("postprocess"));

        postprocess::run(&config, &gateway, sink, Arc::new(SystemClock::new())).await
    })
}
