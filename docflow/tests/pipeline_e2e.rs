//! End-to-end: fixtures through all three stages and back through the
//! harness, against an in-memory store and temp directories.

use async_trait::async_trait;
use chrono::DateTime;
use clap::Parser;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docflow::core::MarkerCheck;
use docflow::harness::{PipelineTrigger, TriggerResponse};
use docflow::prelude::*;
use docflow::stages::{NvidiaProcProbe, PlaceholderModel};

const BUCKET: &str = "pipeline-bucket";

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00+00:00").unwrap(),
    ))
}

/// Fake NVIDIA procfs with one device.
fn fake_gpu_root(root: &Path) -> PathBuf {
    let gpus = root.join("gpus");
    let device = gpus.join("0000:00:1e.0");
    std::fs::create_dir_all(&device).unwrap();
    std::fs::write(device.join("information"), "Model: \t\t Tesla T4\nIRQ: 42\n").unwrap();
    gpus
}

/// Runs the three stages in sequence when triggered.
struct InProcessOrchestrator {
    gateway: Arc<ObjectStoreGateway>,
    layout: PipelineLayout,
    gpu_root: PathBuf,
    clock: Arc<ManualClock>,
    sink: Arc<CollectingEventSink>,
}

impl InProcessOrchestrator {
    async fn run_stages(&self, directory: &str) -> PipelineResult<()> {
        let preprocess_config = PreprocessConfig {
            source_bucket: BUCKET.to_string(),
            input_directory: directory.to_string(),
            layout: self.layout.clone(),
            options: StageOptions::default(),
        };
        preprocess::run(&preprocess_config, self.gateway.as_ref(), self.sink.clone(), self.clock.clone()).await?;

        let gpu_config = GpuConfig {
            layout: self.layout.clone(),
            simulated_work: std::time::Duration::ZERO,
            ..GpuConfig::default()
        };
        gpu::run(
            &gpu_config,
            &NvidiaProcProbe::new(&self.gpu_root),
            &PlaceholderModel,
            self.sink.clone(),
            self.clock.clone(),
        )
        .await?;

        let postprocess_config = PostprocessConfig {
            output_bucket: BUCKET.to_string(),
            output_prefix: format!("{directory}/processed"),
            layout: self.layout.clone(),
            options: StageOptions::default(),
        };
        postprocess::run(&postprocess_config, self.gateway.as_ref(), self.sink.clone(), self.clock.clone()).await?;
        Ok(())
    }
}

#[async_trait]
impl PipelineTrigger for InProcessOrchestrator {
    async fn trigger(&self, directory: &str) -> PipelineResult<TriggerResponse> {
        self.run_stages(directory).await?;
        Ok(TriggerResponse {
            execution_arn: format!("arn:in-process:{directory}"),
        })
    }
}

fn harness_config(test_dir: &Path) -> HarnessConfig {
    HarnessConfig::try_parse_from([
        "docflow-pipeline-test",
        "--api-url",
        "http://unused/trigger",
        "--bucket",
        BUCKET,
        "--test-dir",
        test_dir.to_str().unwrap(),
        "--s3-prefix",
        "test-docs",
    ])
    .unwrap()
}

#[tokio::test]
async fn test_full_pipeline_passes_harness() {
    let root = tempfile::tempdir().unwrap();
    let gateway = Arc::new(ObjectStoreGateway::in_memory());
    let clock = manual_clock();
    let sink = Arc::new(CollectingEventSink::new());
    let orchestrator = InProcessOrchestrator {
        gateway: gateway.clone(),
        layout: PipelineLayout::new(root.path().join("efs"), root.path().join("tmp")),
        gpu_root: fake_gpu_root(root.path()),
        clock: clock.clone(),
        sink: sink.clone(),
    };
    let test_dir = root.path().join("fixtures");

    let harness = PipelineHarness::new(
        harness_config(&test_dir),
        gateway.clone(),
        Arc::new(orchestrator),
        clock.clone(),
        sink.clone(),
    );
    let outcome = harness.run().await.unwrap();

    assert_eq!(outcome.execution_id, "arn:in-process:test-docs");
    assert_eq!(outcome.uploaded, 5);
    assert_eq!(outcome.found, 5);
    assert_eq!(harness.state(), HarnessState::Passed);
    assert!(clock.sleeps().is_empty());

    let result = std::fs::read_to_string(test_dir.join("processed/test_doc_1.txt")).unwrap();
    let original = std::fs::read_to_string(test_dir.join("test_doc_1.txt")).unwrap();
    assert!(result.contains(&original));
    assert!(result.contains("[GPU Processed with Tesla T4 at 2024-05-01 12:00:00]"));

    let check = MarkerCheck::inspect(&result);
    assert!(check.is_complete());
    assert!(check.is_ordered());

    assert_eq!(sink.events_of_type("stage.completed").len(), 3);
    assert_eq!(sink.events_of_type("storage.uploaded").len(), 10);
}

#[tokio::test]
async fn test_stage_rerun_overwrites_without_error() {
    let root = tempfile::tempdir().unwrap();
    let layout = PipelineLayout::new(root.path().join("efs"), root.path().join("tmp"));
    std::fs::create_dir_all(layout.preprocessed_dir()).unwrap();
    std::fs::write(layout.preprocessed_dir().join("a.txt"), "body").unwrap();
    let config = GpuConfig {
        layout: layout.clone(),
        simulated_work: std::time::Duration::ZERO,
        ..GpuConfig::default()
    };
    let gpu_root = fake_gpu_root(root.path());

    for _ in 0..2 {
        let report = gpu::run(
            &config,
            &NvidiaProcProbe::new(&gpu_root),
            &PlaceholderModel,
            Arc::new(NoOpEventSink),
            manual_clock(),
        )
        .await
        .unwrap();
        assert_eq!(report.processed_count(), 1);
    }

    let out = std::fs::read_to_string(layout.processed_dir().join("a.txt")).unwrap();
    assert_eq!(out.matches("[GPU Processed with").count(), 1);
}

#[tokio::test]
async fn test_empty_mount_processes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let config = PostprocessConfig {
        output_bucket: BUCKET.to_string(),
        output_prefix: "out".to_string(),
        layout: PipelineLayout::new(root.path().join("efs"), root.path().join("tmp")),
        options: StageOptions::default(),
    };
    let gateway = ObjectStoreGateway::in_memory();

    let report = postprocess::run(&config, &gateway, Arc::new(NoOpEventSink), manual_clock())
        .await
        .unwrap();

    assert_eq!(report.processed_count(), 0);
    assert!(gateway.list(BUCKET, "out").await.unwrap().is_empty());
}

#[test]
fn test_missing_configuration_touches_nothing() {
    let env = MapEnv::new().with("SOURCE_BUCKET", "bucket");
    let err = PreprocessConfig::from_env(&env).unwrap_err();

    assert_eq!(err.kind(), "configuration_missing");
    assert_eq!(err.exit_code(), 1);
}
