//! Stage run reports.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

use super::StageLabel;
use crate::errors::PipelineError;

/// Record of a file that failed while the batch kept going.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    /// Input file path.
    pub file: PathBuf,
    /// Error message.
    pub error: String,
    /// Error kind name.
    pub error_type: String,
}

impl FileFailure {
    /// Creates a failure record from the error that caused it.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, error: &PipelineError) -> Self {
        Self {
            file: file.into(),
            error: error.to_string(),
            error_type: error.kind().to_string(),
        }
    }
}

/// Outcome of one stage run over one input directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Identifier of this run, for log correlation.
    pub run_id: Uuid,
    /// The stage that ran.
    pub stage: StageLabel,
    /// Directory that was read.
    pub input_dir: PathBuf,
    /// Directory that was written.
    pub output_dir: PathBuf,
    /// Output files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Files that failed under per-file isolation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FileFailure>,
    /// Wall time of the run in milliseconds.
    pub duration_ms: f64,
}

impl StageReport {
    /// Creates an empty report for a run that is about to start.
    #[must_use]
    pub fn new(stage: StageLabel, input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            written: Vec::new(),
            failures: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Number of files successfully processed.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.written.len()
    }

    /// Number of files attempted.
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    /// Returns true if any file failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Fraction of attempted files that succeeded; 1.0 for an empty run.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let attempted = self.attempted_count();
        if attempted == 0 {
            return 1.0;
        }
        self.processed_count() as f64 / attempted as f64
    }

    /// Converts the report into the failure it represents, if any.
    pub fn into_result(self) -> Result<Self, PipelineError> {
        if self.has_failures() {
            return Err(PipelineError::BatchFailed {
                stage: self.stage.to_string(),
                failed: self.failures.len(),
                total: self.attempted_count(),
            });
        }
        Ok(self)
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("stage".to_string(), serde_json::json!(self.stage.name()));
        map.insert("processed".to_string(), serde_json::json!(self.processed_count()));
        map.insert("failed".to_string(), serde_json::json!(self.failures.len()));
        map.insert("success_rate".to_string(), serde_json::json!(self.success_rate()));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map
    }
}
