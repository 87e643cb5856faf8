//! The directory runner shared by all three stages.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use super::transform::DocumentTransform;
use crate::config::StageOptions;
use crate::core::{scan_directory, FileFailure, FileRecord, OutputNaming, StageReport};
use crate::errors::{PipelineError, PipelineResult};
use crate::events::{types, EventSink};
use crate::observability::SpanTimer;
use crate::utils::Clock;

/// How output files are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteMode {
    /// Write straight over the target path.
    #[default]
    Overwrite,
    /// Write a temp file in the output directory, then rename it into place.
    Atomic,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "atomic" => Ok(Self::Atomic),
            other => Err(format!("expected 'overwrite' or 'atomic', got '{other}'")),
        }
    }
}

/// What a failing file does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailureMode {
    /// Abort the batch on the first failure.
    #[default]
    FailFast,
    /// Record the failure and keep going.
    Isolate,
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Ok(Self::FailFast),
            "isolate" => Ok(Self::Isolate),
            other => Err(format!("expected 'fail_fast' or 'isolate', got '{other}'")),
        }
    }
}

/// Applies a transform to every regular file directly inside an input
/// directory, writing each result under the same name in an output
/// directory.
///
/// Files are handled one at a time in name order. Concurrent runs against
/// the same directories must be serialised by the caller.
pub struct StageRunner {
    transform: Arc<dyn DocumentTransform>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    write_mode: WriteMode,
    failure_mode: FailureMode,
    naming: OutputNaming,
}

impl fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRunner")
            .field("stage", &self.transform.label())
            .field("write_mode", &self.write_mode)
            .field("failure_mode", &self.failure_mode)
            .field("naming", &self.naming)
            .finish()
    }
}

impl StageRunner {
    /// Creates a fail-fast, overwriting runner.
    #[must_use]
    pub fn new(
        transform: Arc<dyn DocumentTransform>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transform,
            sink,
            clock,
            write_mode: WriteMode::default(),
            failure_mode: FailureMode::default(),
            naming: OutputNaming::default(),
        }
    }

    /// Sets the write mode.
    #[must_use]
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Applies both knobs from stage options.
    #[must_use]
    pub fn with_options(self, options: StageOptions) -> Self {
        self.with_write_mode(options.write_mode)
            .with_failure_mode(options.failure_mode)
    }

    /// Sets how output files are named.
    #[must_use]
    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Processes `input_dir` into `output_dir`.
    ///
    /// The output directory is created if missing and never cleared. A
    /// missing input directory means zero work. Under
    /// [`FailureMode::FailFast`] the first error is returned as is; under
    /// [`FailureMode::Isolate`] failures are collected in the report.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> PipelineResult<StageReport> {
        let stage = self.transform.label();
        let timer = SpanTimer::start(format!("stage.{stage}"));
        let mut report = StageReport::new(stage, input_dir, output_dir);

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|err| PipelineError::io(output_dir, err))?;

        let records = scan_directory(input_dir)?;
        self.sink.emit(
            types::STAGE_STARTED,
            Some(serde_json::json!({
                "run_id": report.run_id.to_string(),
                "stage": stage.name(),
                "input_dir": input_dir.display().to_string(),
                "output_dir": output_dir.display().to_string(),
                "files": records.len(),
            })),
        );

        for record in &records {
            match self.process_file(record, output_dir).await {
                Ok(output_path) => {
                    self.sink.emit(
                        types::FILE_PROCESSED,
                        Some(serde_json::json!({
                            "stage": stage.name(),
                            "file": record.name(),
                            "output": output_path.display().to_string(),
                        })),
                    );
                    report.written.push(output_path);
                }
                Err(err) => match self.failure_mode {
                    FailureMode::FailFast => {
                        error!(stage = %stage, file = %record.path().display(), error = %err, "Stage aborted");
                        return Err(err);
                    }
                    FailureMode::Isolate => {
                        error!(stage = %stage, file = %record.path().display(), error = %err, "File failed");
                        self.sink.emit(
                            types::FILE_FAILED,
                            Some(serde_json::json!({
                                "stage": stage.name(),
                                "file": record.name(),
                                "error": err.to_string(),
                                "error_type": err.kind(),
                            })),
                        );
                        report.failures.push(FileFailure::new(record.path(), &err));
                    }
                },
            }
        }

        report.duration_ms = timer.elapsed_ms();
        info!(
            stage = %stage,
            span = timer.name(),
            duration_ms = report.duration_ms,
            count = report.processed_count(),
            failed = report.failures.len(),
            "Processed {} files",
            report.processed_count()
        );
        self.sink.emit(
            types::STAGE_COMPLETED,
            Some(serde_json::json!(report.to_dict())),
        );

        Ok(report)
    }

    async fn process_file(&self, record: &FileRecord, output_dir: &Path) -> PipelineResult<PathBuf> {
        info!(file = %record.path().display(), "Processing file");

        let content = tokio::fs::read_to_string(record.path())
            .await
            .map_err(|err| PipelineError::io(record.path(), err))?;

        let timestamp = self.clock.wall_clock();
        let processed = self.transform.transform(record, &content, &timestamp).await?;

        let output_path = output_dir.join(record.output_name(&self.naming));
        match self.write_mode {
            WriteMode::Overwrite => tokio::fs::write(&output_path, processed)
                .await
                .map_err(|err| PipelineError::io(&output_path, err))?,
            WriteMode::Atomic => write_atomic(output_dir.to_path_buf(), output_path.clone(), processed).await?,
        }

        info!(output = %output_path.display(), "Saved processed file");
        Ok(output_path)
    }
}

/// Writes through a temp file in `dir` renamed onto `target`.
async fn write_atomic(dir: PathBuf, target: PathBuf, content: String) -> PipelineResult<()> {
    let join_target = target.clone();
    tokio::task::spawn_blocking(move || {
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(|err| PipelineError::io(&dir, err))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|err| PipelineError::io(temp.path(), err))?;
        temp.persist(&target)
            .map_err(|err| PipelineError::io(&target, err.error))?;
        Ok(())
    })
    .await
    .map_err(|err| PipelineError::io(&join_target, std::io::Error::other(err)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageLabel;
    use crate::events::CollectingEventSink;
    use crate::stages::{FnTransform, MarkerTransform};
    use crate::utils::{ManualClock, Timestamp};
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn clock() -> Arc<ManualClock> {
        let origin: Timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00+00:00").unwrap();
        Arc::new(ManualClock::new(origin))
    }

    fn runner(label: StageLabel, sink: Arc<CollectingEventSink>) -> StageRunner {
        StageRunner::new(Arc::new(MarkerTransform::new(label)), sink, clock())
    }

    #[tokio::test]
    async fn test_run_processes_every_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("deep").join("out");
        std::fs::create_dir_all(input.join("subdir")).unwrap();
        std::fs::write(input.join("a.txt"), "alpha").unwrap();
        std::fs::write(input.join("b.txt"), "beta").unwrap();
        std::fs::write(input.join("subdir").join("c.txt"), "ignored").unwrap();
        let sink = Arc::new(CollectingEventSink::new());

        let report = runner(StageLabel::Preprocess, sink.clone())
            .run(&input, &output)
            .await
            .unwrap();

        assert_eq!(report.processed_count(), 2);
        assert_eq!(
            std::fs::read_to_string(output.join("a.txt")).unwrap(),
            "[Preprocessed at 2024-05-01 12:00:00]\nalpha"
        );
        assert!(!output.join("c.txt").exists());
        assert_eq!(sink.events_of_type("stage.file_processed").len(), 2);
        assert_eq!(
            sink.last_of_type("stage.completed").unwrap()["processed"],
            serde_json::json!(2)
        );
    }

    #[tokio::test]
    async fn test_empty_input_directory_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        let sink = Arc::new(CollectingEventSink::new());

        let report = runner(StageLabel::Postprocess, sink.clone())
            .run(&input, &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(report.processed_count(), 0);
        assert_eq!(
            sink.last_of_type("stage.completed").unwrap()["processed"],
            serde_json::json!(0)
        );
    }

    #[tokio::test]
    async fn test_missing_input_directory_is_zero_work() {
        let dir = tempfile::tempdir().unwrap();
        let report = runner(StageLabel::Postprocess, Arc::new(CollectingEventSink::new()))
            .run(&dir.path().join("absent"), &dir.path().join("out"))
            .await
            .unwrap();

        assert_eq!(report.processed_count(), 0);
        assert!(dir.path().join("out").is_dir());
    }

    #[tokio::test]
    async fn test_rerun_against_existing_output_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        std::fs::create_dir(&input).unwrap();
        std::fs::create_dir(&output).unwrap();
        std::fs::write(output.join("keep.txt"), "untouched").unwrap();
        std::fs::write(input.join("a.txt"), "v1").unwrap();

        let stage = runner(StageLabel::Postprocess, Arc::new(CollectingEventSink::new()));
        stage.run(&input, &output).await.unwrap();
        std::fs::write(input.join("a.txt"), "v2").unwrap();
        stage.run(&input, &output).await.unwrap();

        assert!(std::fs::read_to_string(output.join("a.txt")).unwrap().starts_with("v2\n"));
        assert_eq!(std::fs::read_to_string(output.join("keep.txt")).unwrap(), "untouched");
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("a.txt"), "a").unwrap();
        std::fs::write(input.join("b.bin"), [0xff_u8, 0xfe, 0x00]).unwrap();
        std::fs::write(input.join("c.txt"), "c").unwrap();

        let err = runner(StageLabel::Preprocess, Arc::new(CollectingEventSink::new()))
            .run(&input, &output)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "io");
        assert!(output.join("a.txt").exists());
        assert!(!output.join("c.txt").exists());
    }

    #[tokio::test]
    async fn test_isolate_records_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("a.txt"), "a").unwrap();
        std::fs::write(input.join("bad.txt"), "boom").unwrap();
        std::fs::write(input.join("c.txt"), "c").unwrap();
        let transform = FnTransform::new(StageLabel::GpuProcess, |record, content, _ts| {
            if record.stem() == "bad" {
                return Err(PipelineError::ModelLoad("inference failed".to_string()));
            }
            Ok(content.to_string())
        });
        let sink = Arc::new(CollectingEventSink::new());

        let report = StageRunner::new(Arc::new(transform), sink.clone(), clock())
            .with_failure_mode(FailureMode::Isolate)
            .run(&input, &output)
            .await
            .unwrap();

        assert_eq!(report.processed_count(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error_type, "model_load");
        assert_eq!(sink.events_of_type("stage.file_failed").len(), 1);
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn test_atomic_write_and_suffixed_naming() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("doc.txt"), "body").unwrap();

        let report = runner(StageLabel::Postprocess, Arc::new(CollectingEventSink::new()))
            .with_write_mode(WriteMode::Atomic)
            .with_naming(OutputNaming::Suffixed("_processed".to_string()))
            .run(&input, &output)
            .await
            .unwrap();

        assert_eq!(report.written, vec![output.join("doc_processed.txt")]);
        let names: Vec<_> = std::fs::read_dir(&output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc_processed.txt".to_string()]);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("ATOMIC".parse::<WriteMode>(), Ok(WriteMode::Atomic));
        assert_eq!("fail-fast".parse::<FailureMode>(), Ok(FailureMode::FailFast));
        assert!("sometimes".parse::<FailureMode>().is_err());
    }
}
