//! Fixture documents for a harness run.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::{PipelineError, PipelineResult};
use crate::events::EventSink;
use crate::storage::{upload_directory, StorageGateway};
use crate::utils::{format_marker_timestamp, Timestamp};

/// Body of fixture number `index` (1-based).
#[must_use]
pub fn fixture_content(index: usize, created_at: &Timestamp) -> String {
    format!(
        "Test Document {index}\nThis is a test document for the Document AI Pipeline.\nCreated at: {}",
        format_marker_timestamp(created_at)
    )
}

/// Writes `test_doc_1.txt` through `test_doc_<count>.txt` into `dir`.
pub fn create_test_files(dir: &Path, count: usize, created_at: &Timestamp) -> PipelineResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|err| PipelineError::io(dir, err))?;

    (1..=count)
        .map(|index| {
            let path = dir.join(format!("test_doc_{index}.txt"));
            std::fs::write(&path, fixture_content(index, created_at))
                .map_err(|err| PipelineError::io(&path, err))?;
            info!(file = %path.display(), "Created test file");
            Ok(path)
        })
        .collect()
}

/// Uploads every regular file in `dir` to `<prefix>/<name>`.
///
/// Returns how many files were uploaded. Pre-existing files in `dir` are
/// uploaded too, so this count, not the number created, is what the
/// harness waits for.
pub async fn upload_test_files(
    gateway: &dyn StorageGateway,
    dir: &Path,
    bucket: &str,
    prefix: &str,
    sink: &dyn EventSink,
) -> PipelineResult<usize> {
    let keys = upload_directory(gateway, dir, bucket, prefix, sink).await?;
    Ok(keys.len())
}
