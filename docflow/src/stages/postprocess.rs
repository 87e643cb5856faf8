//! Postprocess stage: shared mount to object storage.

use std::sync::Arc;
use tracing::info;

use super::{MarkerTransform, StageRunner};
use crate::config::PostprocessConfig;
use crate::core::{StageLabel, StageReport};
use crate::errors::PipelineResult;
use crate::events::EventSink;
use crate::storage::{upload_directory, StorageGateway};
use crate::utils::Clock;

/// Marks every processed file into scratch, then uploads the scratch
/// directory under `OUTPUT_PREFIX`.
///
/// With per-file isolation the successful files are still uploaded before
/// the batch failure is returned.
pub async fn run(
    config: &PostprocessConfig,
    gateway: &dyn StorageGateway,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
) -> PipelineResult<StageReport> {
    let scratch = config.layout.scratch_output();
    let runner = StageRunner::new(
        Arc::new(MarkerTransform::new(StageLabel::Postprocess)),
        sink.clone(),
        clock,
    )
    .with_options(config.options);

    let report = runner.run(&config.layout.processed_dir(), &scratch).await?;

    let keys = upload_directory(
        gateway,
        &scratch,
        &config.output_bucket,
        &config.output_prefix,
        sink.as_ref(),
    )
    .await?;
    info!(
        count = keys.len(),
        bucket = %config.output_bucket,
        prefix = %config.output_prefix,
        "Uploaded {} files to s3://{}/{}",
        keys.len(),
        config.output_bucket,
        config.output_prefix
    );

    report.into_result()
}
