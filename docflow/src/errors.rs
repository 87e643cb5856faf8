//! Error types for the docflow pipeline.
//!
//! Every failure a stage or the harness can report maps onto one variant
//! of [`PipelineError`]. None of them are retried; each one terminates the
//! calling process with exit status 1 after being logged.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Boxed transport error carried by storage and trigger failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    /// Listing keys under a prefix.
    List,
    /// Downloading a key to a local path.
    Download,
    /// Uploading a local path to a key.
    Upload,
    /// Building a client for a bucket.
    Connect,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
            Self::Connect => write!(f, "connect"),
        }
    }
}

/// The main error type for docflow operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more required environment values are absent.
    #[error("Required configuration missing for {stage}: {}", names.join(", "))]
    ConfigurationMissing {
        /// The stage whose configuration was being resolved.
        stage: String,
        /// Every missing variable name.
        names: Vec<String>,
    },

    /// An optional configuration value was present but unparseable.
    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidConfiguration {
        /// The variable name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// No accelerator is present.
    #[error("No GPU available: {0}")]
    DeviceUnavailable(String),

    /// The model-load precondition failed.
    #[error("Error loading model: {0}")]
    ModelLoad(String),

    /// A list/download/upload call against object storage failed.
    #[error("Storage {operation} failed for s3://{bucket}/{key}: {source}")]
    Storage {
        /// The failed operation.
        operation: StorageOperation,
        /// The bucket.
        bucket: String,
        /// The key or prefix.
        key: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// The preprocess download found nothing to work on.
    #[error("No files found in s3://{bucket}/{prefix}")]
    NoInputs {
        /// The bucket.
        bucket: String,
        /// The prefix that was listed.
        prefix: String,
    },

    /// A local read or write failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// One or more files failed while running with per-file isolation.
    #[error("Stage {stage} failed on {failed} of {total} files")]
    BatchFailed {
        /// The stage name.
        stage: String,
        /// Number of failed files.
        failed: usize,
        /// Number of files attempted.
        total: usize,
    },

    /// The orchestrator trigger call failed.
    #[error("Error triggering processing at {url}: {reason}")]
    Trigger {
        /// The trigger endpoint.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// Polling reached its deadline before the expected count appeared.
    #[error(
        "Timeout waiting for results under {prefix} after {}s ({found}/{expected} files done)",
        waited.as_secs()
    )]
    Timeout {
        /// The polled prefix.
        prefix: String,
        /// Files seen on the last check.
        found: usize,
        /// Files expected.
        expected: usize,
        /// Time spent polling.
        waited: Duration,
    },

    /// A downloaded result lacks an expected marker.
    #[error("File {} missing processing markers: {}", file.display(), missing.join(", "))]
    Verification {
        /// The local copy that failed verification.
        file: PathBuf,
        /// The marker prefixes that were absent or out of order.
        missing: Vec<String>,
    },
}

impl PipelineError {
    /// Creates an IO error bound to a path.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a storage error.
    pub fn storage(
        operation: StorageOperation,
        bucket: impl Into<String>,
        key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Storage {
            operation,
            bucket: bucket.into(),
            key: key.into(),
            source: source.into(),
        }
    }

    /// Creates a trigger error.
    pub fn trigger(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Trigger {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns a stable snake_case name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing { .. } => "configuration_missing",
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::DeviceUnavailable(_) => "device_unavailable",
            Self::ModelLoad(_) => "model_load",
            Self::Storage { .. } => "storage",
            Self::NoInputs { .. } => "no_inputs",
            Self::Io { .. } => "io",
            Self::BatchFailed { .. } => "batch_failed",
            Self::Trigger { .. } => "trigger",
            Self::Timeout { .. } => "timeout",
            Self::Verification { .. } => "verification",
        }
    }

    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        1
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::ConfigurationMissing { stage, names } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
                map.insert("names".to_string(), serde_json::json!(names));
            }
            Self::Storage {
                operation,
                bucket,
                key,
                ..
            } => {
                map.insert("operation".to_string(), serde_json::json!(operation.to_string()));
                map.insert("bucket".to_string(), serde_json::json!(bucket));
                map.insert("key".to_string(), serde_json::json!(key));
            }
            Self::Io { path, .. } => {
                map.insert("path".to_string(), serde_json::json!(path.display().to_string()));
            }
            Self::Timeout {
                found,
                expected,
                waited,
                ..
            } => {
                map.insert("found".to_string(), serde_json::json!(found));
                map.insert("expected".to_string(), serde_json::json!(expected));
                map.insert("waited_seconds".to_string(), serde_json::json!(waited.as_secs_f64()));
            }
            Self::Verification { file, missing } => {
                map.insert("file".to_string(), serde_json::json!(file.display().to_string()));
                map.insert("missing".to_string(), serde_json::json!(missing));
            }
            _ => {}
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_missing_lists_every_name() {
        let err = PipelineError::ConfigurationMissing {
            stage: "preprocess".to_string(),
            names: vec!["SOURCE_BUCKET".to_string(), "INPUT_DIRECTORY".to_string()],
        };

        let message = err.to_string();
        assert!(message.contains("preprocess"));
        assert!(message.contains("SOURCE_BUCKET, INPUT_DIRECTORY"));
        assert_eq!(err.kind(), "configuration_missing");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_storage_error_wraps_source() {
        let err = PipelineError::storage(StorageOperation::Download, "bucket", "docs/a.txt", "connection reset");

        assert!(err.to_string().contains("download"));
        assert!(err.to_string().contains("s3://bucket/docs/a.txt"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_timeout_is_distinct_from_verification() {
        let timeout = PipelineError::Timeout {
            prefix: "test/processed".to_string(),
            found: 2,
            expected: 5,
            waited: Duration::from_secs(300),
        };
        let verification = PipelineError::Verification {
            file: PathBuf::from("/tmp/a.txt"),
            missing: vec!["[GPU Processed with".to_string()],
        };

        assert_ne!(timeout.kind(), verification.kind());
        assert!(timeout.to_string().contains("300s"));
        assert!(timeout.to_string().contains("2/5"));
    }

    #[test]
    fn test_to_dict() {
        let err = PipelineError::io("/efs/processed/a.txt", std::io::Error::other("disk full"));
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "io");
        assert_eq!(dict.get("path").unwrap(), "/efs/processed/a.txt");
    }
}
