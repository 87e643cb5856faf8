//! Process entry helpers shared by the binaries.

use anyhow::{Context, Result};
use std::future::Future;
use std::process::ExitCode;
use tracing::error;

use crate::errors::PipelineResult;

/// Builds the single-threaded runtime every binary runs on.
pub fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

/// Runs `task` to completion and maps its result to a process exit code.
///
/// Errors are logged with `failure` as the message before exiting.
pub fn run_to_exit<T, F>(failure: &str, task: F) -> ExitCode
where
    F: Future<Output = PipelineResult<T>>,
{
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %format!("{err:#}"), "{failure}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(task) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, error_type = err.kind(), "{failure}");
            ExitCode::from(err.exit_code())
        }
    }
}
