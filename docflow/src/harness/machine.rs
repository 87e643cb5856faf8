//! The harness state machine.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::fixtures::{create_test_files, upload_test_files};
use super::poll::{wait_for_results, PollSettings};
use super::trigger::PipelineTrigger;
use super::verify::verify_results;
use crate::config::HarnessConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::events::{types, EventSink};
use crate::storage::StorageGateway;
use crate::utils::Clock;

/// Where a harness run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessState {
    /// Writing fixture documents locally.
    CreatingFixtures,
    /// Uploading fixtures to the input prefix.
    Uploading,
    /// Calling the orchestrator.
    Triggering,
    /// Waiting for results under the output prefix.
    Polling,
    /// Downloading and checking results.
    Verifying,
    /// Every result verified.
    Passed,
    /// Some step failed.
    Failed,
}

impl HarnessState {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatingFixtures => "creating_fixtures",
            Self::Uploading => "uploading",
            Self::Triggering => "triggering",
            Self::Polling => "polling",
            Self::Verifying => "verifying",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }

    /// Returns true for `Passed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of a passing harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessOutcome {
    /// Identifier of this harness run.
    pub run_id: Uuid,
    /// Execution identifier returned by the trigger.
    pub execution_id: String,
    /// Fixtures uploaded, which is also the count waited for.
    pub uploaded: usize,
    /// Results present on the final poll.
    pub found: usize,
    /// Local copies of the verified results.
    pub verified: Vec<PathBuf>,
}

/// Runs fixtures → upload → trigger → poll → verify, once.
pub struct PipelineHarness {
    config: HarnessConfig,
    gateway: Arc<dyn StorageGateway>,
    trigger: Arc<dyn PipelineTrigger>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    run_id: Uuid,
    history: Mutex<Vec<HarnessState>>,
}

impl fmt::Debug for PipelineHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHarness")
            .field("run_id", &self.run_id)
            .field("bucket", &self.config.bucket)
            .field("prefix", &self.config.s3_prefix)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PipelineHarness {
    /// Creates a harness; nothing happens until [`run`](Self::run).
    #[must_use]
    pub fn new(
        config: HarnessConfig,
        gateway: Arc<dyn StorageGateway>,
        trigger: Arc<dyn PipelineTrigger>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            gateway,
            trigger,
            clock,
            sink,
            run_id: Uuid::new_v4(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// The latest state, or `CreatingFixtures` before the run starts.
    pub fn state(&self) -> HarnessState {
        self.history
            .lock()
            .last()
            .copied()
            .unwrap_or(HarnessState::CreatingFixtures)
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> Vec<HarnessState> {
        self.history.lock().clone()
    }

    /// Drives the run to a terminal state.
    ///
    /// On failure the error is logged, `Failed` is recorded along with the
    /// state it happened in, and the error is returned unchanged.
    pub async fn run(&self) -> PipelineResult<HarnessOutcome> {
        info!(run_id = %self.run_id, "=== Starting Document AI Pipeline Test ===");

        match self.drive().await {
            Ok(outcome) => {
                self.enter(HarnessState::Passed, None);
                info!(run_id = %self.run_id, "=== Document AI Pipeline Test Completed Successfully ===");
                Ok(outcome)
            }
            Err(err) => {
                let failed_in = self.state();
                error!(run_id = %self.run_id, state = %failed_in, error = %err, "Pipeline test failed");
                self.enter(HarnessState::Failed, Some((failed_in, &err)));
                Err(err)
            }
        }
    }

    async fn drive(&self) -> PipelineResult<HarnessOutcome> {
        let config = &self.config;

        self.enter(HarnessState::CreatingFixtures, None);
        create_test_files(&config.test_dir, config.num_files, &self.clock.wall_clock())?;

        self.enter(HarnessState::Uploading, None);
        let uploaded = upload_test_files(
            self.gateway.as_ref(),
            &config.test_dir,
            &config.bucket,
            &config.s3_prefix,
            self.sink.as_ref(),
        )
        .await?;
        info!(count = uploaded, "Uploaded {} files", uploaded);

        self.enter(HarnessState::Triggering, None);
        let response = self.trigger.trigger(&config.s3_prefix).await?;
        info!(execution_arn = %response.execution_arn, "Pipeline triggered");

        self.enter(HarnessState::Polling, None);
        let output_prefix = config.output_prefix();
        let settings = PollSettings {
            timeout: config.timeout(),
            interval: config.poll_interval(),
        };
        let found = wait_for_results(
            self.gateway.as_ref(),
            &config.bucket,
            &output_prefix,
            uploaded,
            settings,
            self.clock.as_ref(),
            self.sink.as_ref(),
        )
        .await?;

        self.enter(HarnessState::Verifying, None);
        let verified = verify_results(
            self.gateway.as_ref(),
            &config.bucket,
            &output_prefix,
            &config.test_dir.join("processed"),
            self.sink.as_ref(),
        )
        .await?;

        Ok(HarnessOutcome {
            run_id: self.run_id,
            execution_id: response.execution_arn,
            uploaded,
            found,
            verified,
        })
    }

    fn enter(&self, state: HarnessState, failure: Option<(HarnessState, &PipelineError)>) {
        self.history.lock().push(state);
        info!(run_id = %self.run_id, state = %state, "Harness state changed");

        let mut data = serde_json::json!({
            "run_id": self.run_id.to_string(),
            "state": state,
            "elapsed_secs": self.clock.elapsed().as_secs_f64(),
        });
        if let Some((failed_in, err)) = failure {
            data["failed_in"] = serde_json::json!(failed_in);
            data["error"] = serde_json::json!(err.to_dict());
        }
        self.sink.emit(types::HARNESS_STATE, Some(data));
    }
}
