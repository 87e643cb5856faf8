//! Document transforms.
//!
//! The transform is the pluggable part of a stage: text in, text out,
//! stamped with the stage's marker. Real inference replaces
//! [`GpuTransform`] with another implementation of the same trait.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{FileRecord, Marker, StageLabel};
use crate::errors::PipelineResult;
use crate::utils::{Clock, Timestamp};

/// Trait for per-document transforms.
#[async_trait]
pub trait DocumentTransform: Send + Sync + Debug {
    /// The stage this transform implements.
    fn label(&self) -> StageLabel;

    /// Transforms one document.
    ///
    /// # Arguments
    ///
    /// * `record` - The input file being processed
    /// * `content` - Its full text
    /// * `timestamp` - Wall-clock time to stamp into the marker
    async fn transform(
        &self,
        record: &FileRecord,
        content: &str,
        timestamp: &Timestamp,
    ) -> PipelineResult<String>;
}

/// Annotation-only transform for the preprocess and postprocess stages.
#[derive(Debug, Clone, Copy)]
pub struct MarkerTransform {
    label: StageLabel,
}

impl MarkerTransform {
    /// Creates a marker transform for `label`.
    #[must_use]
    pub const fn new(label: StageLabel) -> Self {
        Self { label }
    }
}

#[async_trait]
impl DocumentTransform for MarkerTransform {
    fn label(&self) -> StageLabel {
        self.label
    }

    async fn transform(
        &self,
        _record: &FileRecord,
        content: &str,
        timestamp: &Timestamp,
    ) -> PipelineResult<String> {
        Ok(Marker::new(self.label, timestamp).apply(content))
    }
}

/// Stand-in for GPU inference: a fixed delay, then the device marker.
#[derive(Debug, Clone)]
pub struct GpuTransform {
    device_name: String,
    simulated_work: Duration,
    clock: Arc<dyn Clock>,
}

impl GpuTransform {
    /// Creates a transform that reports `device_name` in its marker.
    #[must_use]
    pub fn new(device_name: impl Into<String>, simulated_work: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            device_name: device_name.into(),
            simulated_work,
            clock,
        }
    }
}

#[async_trait]
impl DocumentTransform for GpuTransform {
    fn label(&self) -> StageLabel {
        StageLabel::GpuProcess
    }

    async fn transform(
        &self,
        _record: &FileRecord,
        content: &str,
        timestamp: &Timestamp,
    ) -> PipelineResult<String> {
        if !self.simulated_work.is_zero() {
            self.clock.sleep(self.simulated_work).await;
        }
        Ok(Marker::gpu(&self.device_name, timestamp).apply(content))
    }
}

/// A transform built from a plain function.
pub struct FnTransform<F>
where
    F: Fn(&FileRecord, &str, &Timestamp) -> PipelineResult<String> + Send + Sync,
{
    label: StageLabel,
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&FileRecord, &str, &Timestamp) -> PipelineResult<String> + Send + Sync,
{
    /// Creates a function-based transform.
    pub fn new(label: StageLabel, func: F) -> Self {
        Self { label, func }
    }
}

impl<F> Debug for FnTransform<F>
where
    F: Fn(&FileRecord, &str, &Timestamp) -> PipelineResult<String> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTransform")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl<F> DocumentTransform for FnTransform<F>
where
    F: Fn(&FileRecord, &str, &Timestamp) -> PipelineResult<String> + Send + Sync,
{
    fn label(&self) -> StageLabel {
        self.label
    }

    async fn transform(
        &self,
        record: &FileRecord,
        content: &str,
        timestamp: &Timestamp,
    ) -> PipelineResult<String> {
        (self.func)(record, content, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use chrono::DateTime;

    fn ts() -> Timestamp {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00+00:00").unwrap()
    }

    fn record() -> FileRecord {
        FileRecord::from_path("/tmp/input/a.txt").unwrap()
    }

    #[tokio::test]
    async fn test_marker_transform_keeps_original_content() {
        let transform = MarkerTransform::new(StageLabel::Postprocess);
        let out = transform.transform(&record(), "original body", &ts()).await.unwrap();

        assert!(out.contains("original body"));
        assert!(out.ends_with("[Postprocessed at 2024-05-01 12:00:00]"));
    }

    #[tokio::test]
    async fn test_gpu_transform_sleeps_then_marks() {
        let clock = Arc::new(ManualClock::new(ts()));
        let transform = GpuTransform::new("Tesla T4", Duration::from_secs(2), clock.clone());

        let out = transform.transform(&record(), "x", &ts()).await.unwrap();

        assert_eq!(out, "x\n[GPU Processed with Tesla T4 at 2024-05-01 12:00:00]");
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_gpu_transform_without_delay_does_not_sleep() {
        let clock = Arc::new(ManualClock::new(ts()));
        let transform = GpuTransform::new("cpu", Duration::ZERO, clock.clone());

        transform.transform(&record(), "x", &ts()).await.unwrap();
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_fn_transform() {
        let transform = FnTransform::new(StageLabel::Preprocess, |record, content, _ts| {
            Ok(format!("{}:{}", record.name(), content.to_uppercase()))
        });

        assert_eq!(transform.label(), StageLabel::Preprocess);
        let out = transform.transform(&record(), "abc", &ts()).await.unwrap();
        assert_eq!(out, "a.txt:ABC");
    }
}
