//! Preprocess stage: object storage to the shared mount.

use std::sync::Arc;
use tracing::info;

use super::{MarkerTransform, StageRunner};
use crate::config::PreprocessConfig;
use crate::core::{StageLabel, StageReport};
use crate::errors::PipelineResult;
use crate::events::EventSink;
use crate::storage::{download_prefix, StorageGateway};
use crate::utils::Clock;

/// Downloads `INPUT_DIRECTORY` from the source bucket into scratch, marks
/// every file and writes the results to the preprocessed directory.
pub async fn run(
    config: &PreprocessConfig,
    gateway: &dyn StorageGateway,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
) -> PipelineResult<StageReport> {
    let scratch = config.layout.scratch_input();
    info!(
        bucket = %config.source_bucket,
        prefix = %config.input_directory,
        "Downloading input documents"
    );
    let downloaded = download_prefix(
        gateway,
        &config.source_bucket,
        &config.input_directory,
        &scratch,
        sink.as_ref(),
    )
    .await?;
    info!(count = downloaded.len(), "Downloaded {} files", downloaded.len());

    let runner = StageRunner::new(Arc::new(MarkerTransform::new(StageLabel::Preprocess)), sink, clock)
        .with_options(config.options);

    runner
        .run(&scratch, &config.layout.preprocessed_dir())
        .await?
        .into_result()
}
