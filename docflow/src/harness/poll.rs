//! Bounded polling of the output prefix.

use std::time::Duration;
use tracing::info;

use crate::errors::{PipelineError, PipelineResult};
use crate::events::{types, EventSink};
use crate::storage::{object_keys, StorageGateway};
use crate::utils::Clock;

/// Deadline and cadence of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Total time allowed before giving up.
    pub timeout: Duration,
    /// Delay between consecutive checks.
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(10),
        }
    }
}

/// Lists `prefix` until at least `expected` objects are present.
///
/// A check only starts while the elapsed time is under the timeout, so a
/// prefix that never fills fails after the timeout plus at most one
/// interval. A listing error ends polling immediately. Returns the count
/// seen on the successful check.
pub async fn wait_for_results(
    gateway: &dyn StorageGateway,
    bucket: &str,
    prefix: &str,
    expected: usize,
    settings: PollSettings,
    clock: &dyn Clock,
    sink: &dyn EventSink,
) -> PipelineResult<usize> {
    let started = clock.elapsed();
    let mut found = 0;
    let mut checks = 0_u32;

    loop {
        let waited = clock.elapsed().saturating_sub(started);
        if waited >= settings.timeout {
            info!(prefix, found, expected, "Timeout waiting for results after {}s", waited.as_secs());
            return Err(PipelineError::Timeout {
                prefix: prefix.to_string(),
                found,
                expected,
                waited,
            });
        }

        found = object_keys(gateway.list(bucket, prefix).await?).len();
        checks += 1;
        sink.emit(
            types::HARNESS_POLL,
            Some(serde_json::json!({
                "check": checks,
                "found": found,
                "expected": expected,
                "elapsed_secs": waited.as_secs_f64(),
            })),
        );

        if found >= expected {
            info!(found, expected, "All {} files have been processed", expected);
            return Ok(found);
        }

        info!(found, expected, "Waiting for processing to complete... ({found}/{expected} files done)");
        clock.sleep(settings.interval).await;
    }
}
