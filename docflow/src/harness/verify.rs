//! Marker verification of downloaded results.

use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::core::MarkerCheck;
use crate::errors::{PipelineError, PipelineResult};
use crate::events::EventSink;
use crate::storage::{download_prefix, StorageGateway};

/// Downloads every result under `prefix` into `local_dir` and checks each
/// one for all three stage markers, in stage order.
///
/// Stops at the first file that fails the check. Returns the verified
/// local paths.
pub async fn verify_results(
    gateway: &dyn StorageGateway,
    bucket: &str,
    prefix: &str,
    local_dir: &Path,
    sink: &dyn EventSink,
) -> PipelineResult<Vec<PathBuf>> {
    let files = download_prefix(gateway, bucket, prefix, local_dir, sink).await?;

    for file in &files {
        let content = tokio::fs::read_to_string(file)
            .await
            .map_err(|err| PipelineError::io(file, err))?;

        let check = MarkerCheck::inspect(&content);
        if !check.is_complete() {
            error!(file = %file.display(), "File missing processing markers");
            return Err(PipelineError::Verification {
                file: file.clone(),
                missing: check.missing_prefixes(),
            });
        }
        if !check.is_ordered() {
            error!(file = %file.display(), "File markers out of stage order");
            return Err(PipelineError::Verification {
                file: file.clone(),
                missing: vec!["stage order".to_string()],
            });
        }
    }

    info!(count = files.len(), "All files processed successfully with correct markers");
    Ok(files)
}
