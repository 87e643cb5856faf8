//! Preprocess stage container entry point.
//!
//! Requires `SOURCE_BUCKET` and `INPUT_DIRECTORY`.

use std::process::ExitCode;
use std::sync::Arc;

use docflow::observability::{init_logging, LogFormat};
use docflow::prelude::*;
use docflow::runtime::run_to_exit;

fn main() -> ExitCode {
    init_logging(LogFormat::from_env_or(LogFormat::Json));

    run_to_exit("Error in preprocessing", async {
        let config = PreprocessConfig::from_env(&ProcessEnv)?;
        let gateway = ObjectStoreGateway::s3();
        let sink = Arc::new(LoggingEventSink::default().with_component("preprocess"));

        preprocess::run(&config, &gateway, sink, Arc::new(SystemClock::new())).await
    })
}
