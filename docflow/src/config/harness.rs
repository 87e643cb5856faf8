//! Command-line configuration for the end-to-end harness.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Drive the document pipeline end to end and verify its output.
#[derive(Debug, Clone, Parser)]
#[command(name = "docflow-pipeline-test")]
#[command(about = "Test the document pipeline end to end", long_about = None)]
pub struct HarnessConfig {
    /// Orchestrator trigger URL
    #[arg(long, env = "DOCFLOW_API_URL")]
    pub api_url: String,

    /// Bucket holding fixtures and results
    #[arg(long, env = "DOCFLOW_BUCKET")]
    pub bucket: String,

    /// Local directory for fixtures and downloaded results
    #[arg(long, env = "DOCFLOW_TEST_DIR")]
    pub test_dir: PathBuf,

    /// Key prefix for the fixtures
    #[arg(long, default_value = "test")]
    pub s3_prefix: String,

    /// Number of fixture files to create
    #[arg(long, default_value_t = 5)]
    pub num_files: usize,

    /// Seconds to wait for results before failing
    #[arg(long = "timeout", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Seconds between result checks
    #[arg(long = "poll-interval", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Seconds allowed for the trigger request
    #[arg(long = "trigger-timeout", default_value_t = 10)]
    pub trigger_timeout_secs: u64,
}

impl HarnessConfig {
    /// Polling deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between checks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Trigger request timeout.
    #[must_use]
    pub const fn trigger_timeout(&self) -> Duration {
        Duration::from_secs(self.trigger_timeout_secs)
    }

    /// Prefix the pipeline writes results under.
    #[must_use]
    pub fn output_prefix(&self) -> String {
        format!("{}/processed", self.s3_prefix.trim_end_matches('/'))
    }
}
