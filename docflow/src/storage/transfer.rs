//! Prefix download and directory upload built on a [`StorageGateway`].

use std::path::{Path, PathBuf};
use tracing::info;

use super::StorageGateway;
use crate::core::scan_directory;
use crate::errors::{PipelineError, PipelineResult};
use crate::events::{types, EventSink};

/// Drops directory markers (keys ending in `/`) from a listing, for
/// gateways that report them verbatim.
#[must_use]
pub fn object_keys(keys: Vec<String>) -> Vec<String> {
    keys.into_iter().filter(|key| !key.ends_with('/')).collect()
}

/// Last path segment of a key.
fn key_basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Joins a prefix and a file name into a key.
fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Downloads every object under `prefix` into `local_dir`, flattened to
/// the key's basename.
///
/// Fails with [`PipelineError::NoInputs`] when the prefix holds no objects,
/// since a stage cannot proceed with zero inputs.
pub async fn download_prefix(
    gateway: &dyn StorageGateway,
    bucket: &str,
    prefix: &str,
    local_dir: &Path,
    sink: &dyn EventSink,
) -> PipelineResult<Vec<PathBuf>> {
    let keys = object_keys(gateway.list(bucket, prefix).await?);
    if keys.is_empty() {
        return Err(PipelineError::NoInputs {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
    }

    tokio::fs::create_dir_all(local_dir)
        .await
        .map_err(|err| PipelineError::io(local_dir, err))?;

    let mut downloaded = Vec::with_capacity(keys.len());
    for key in &keys {
        let local_file = local_dir.join(key_basename(key));
        info!(key = %key, local = %local_file.display(), "Downloading object");
        gateway.download(bucket, key, &local_file).await?;
        sink.emit(
            types::DOWNLOADED,
            Some(serde_json::json!({
                "bucket": bucket,
                "key": key,
                "local": local_file.display().to_string(),
            })),
        );
        downloaded.push(local_file);
    }

    Ok(downloaded)
}

/// Uploads every regular file directly inside `local_dir` to
/// `<prefix>/<name>`. Returns the keys written.
pub async fn upload_directory(
    gateway: &dyn StorageGateway,
    local_dir: &Path,
    bucket: &str,
    prefix: &str,
    sink: &dyn EventSink,
) -> PipelineResult<Vec<String>> {
    let mut uploaded = Vec::new();

    for record in scan_directory(local_dir)? {
        let key = join_key(prefix, record.name());
        info!(file = %record.path().display(), bucket, key = %key, "Uploading file");
        gateway.upload(record.path(), bucket, &key).await?;
        sink.emit(
            types::UPLOADED,
            Some(serde_json::json!({ "bucket": bucket, "key": key })),
        );
        uploaded.push(key);
    }

    info!(count = uploaded.len(), bucket, prefix, "Uploaded files");
    Ok(uploaded)
}
