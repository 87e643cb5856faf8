//! End-to-end pipeline test harness.
//!
//! The harness uploads fixtures, triggers the orchestrator, polls the
//! output prefix until every result has landed and then verifies that each
//! result carries all three stage markers. [`PipelineHarness`] sequences
//! the steps as an explicit state machine.

mod fixtures;
mod machine;
mod poll;
mod trigger;
mod verify;

pub use fixtures::{create_test_files, fixture_content, upload_test_files};
pub use machine::{HarnessOutcome, HarnessState, PipelineHarness};
pub use poll::{wait_for_results, PollSettings};
pub use trigger::{HttpTrigger, PipelineTrigger, TriggerResponse};
pub use verify::verify_results;

#[cfg(test)]
pub use trigger::MockPipelineTrigger;
