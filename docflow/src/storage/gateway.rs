//! Storage gateway trait and its `object_store` implementation.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, ObjectMeta, ObjectStore, PutPayload, RetryConfig};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{PipelineError, PipelineResult, StorageOperation};

/// List, download and upload operations keyed by bucket and key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Lists every key under `prefix`, sorted. Implementations drop
    /// directory markers where they can recognise them.
    async fn list(&self, bucket: &str, prefix: &str) -> PipelineResult<Vec<String>>;

    /// Downloads `key` into `local_path`, overwriting it.
    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> PipelineResult<()>;

    /// Uploads the file at `local_path` to `key`.
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> PipelineResult<()>;
}

/// Builds the store for a bucket on first use.
pub type StoreFactory = Arc<dyn Fn(&str) -> PipelineResult<Arc<dyn ObjectStore>> + Send + Sync>;

/// A [`StorageGateway`] over `object_store`, caching one client per bucket.
pub struct ObjectStoreGateway {
    stores: DashMap<String, Arc<dyn ObjectStore>>,
    factory: StoreFactory,
}

impl fmt::Debug for ObjectStoreGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreGateway")
            .field("buckets", &self.stores.len())
            .finish_non_exhaustive()
    }
}

/// Client options for the stage containers: short timeouts, small pool.
fn create_client_options() -> ClientOptions {
    ClientOptions::new()
        .with_connect_timeout(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(60))
        .with_pool_idle_timeout(Duration::from_secs(30))
}

/// Failures surface immediately; nothing is retried.
fn create_retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        backoff: object_store::BackoffConfig::default(),
        retry_timeout: Duration::from_secs(60),
    }
}

/// Keys of a listing with directory markers removed.
///
/// S3 consoles create zero-byte `dir/` objects, and `object_store` strips
/// the trailing `/` when parsing them, so a marker shows up as an empty
/// object named after the prefix itself or after a parent of other keys.
fn drop_directory_markers(objects: &[ObjectMeta], prefix: &ObjectPath) -> Vec<String> {
    let is_marker = |meta: &ObjectMeta| {
        meta.size == 0
            && (meta.location == *prefix
                || objects.iter().any(|other| {
                    other.location != meta.location && other.location.prefix_matches(&meta.location)
                }))
    };

    objects
        .iter()
        .filter(|meta| !is_marker(meta))
        .map(|meta| meta.location.to_string())
        .collect()
}

impl ObjectStoreGateway {
    /// Creates a gateway that builds stores with `factory`.
    #[must_use]
    pub fn new(factory: StoreFactory) -> Self {
        Self {
            stores: DashMap::new(),
            factory,
        }
    }

    /// S3 gateway. Credentials and region come from the standard AWS
    /// environment variables.
    #[must_use]
    pub fn s3() -> Self {
        Self::new(Arc::new(|bucket: &str| {
            tracing::info!(bucket, "Creating S3 client");
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_client_options(create_client_options())
                .with_retry(create_retry_config())
                .build()
                .map_err(|err| PipelineError::storage(StorageOperation::Connect, bucket, "", err))?;
            Ok(Arc::new(store) as Arc<dyn ObjectStore>)
        }))
    }

    /// Gateway backed by a fresh in-memory store per bucket.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(|_bucket: &str| {
            Ok(Arc::new(InMemory::new()) as Arc<dyn ObjectStore>)
        }))
    }

    /// Pins a bucket to an existing store.
    #[must_use]
    pub fn with_store(self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores.insert(bucket.into(), store);
        self
    }

    fn store(&self, bucket: &str) -> PipelineResult<Arc<dyn ObjectStore>> {
        if let Some(store) = self.stores.get(bucket) {
            return Ok(Arc::clone(store.value()));
        }

        let store = (self.factory)(bucket)?;
        self.stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl StorageGateway for ObjectStoreGateway {
    async fn list(&self, bucket: &str, prefix: &str) -> PipelineResult<Vec<String>> {
        let store = self.store(bucket)?;
        let prefix_path = ObjectPath::from(prefix);
        let prefix_arg = (!prefix_path.as_ref().is_empty()).then_some(&prefix_path);

        let objects: Vec<_> = store
            .list(prefix_arg)
            .try_collect()
            .await
            .map_err(|err| PipelineError::storage(StorageOperation::List, bucket, prefix, err))?;

        let mut keys = drop_directory_markers(&objects, &prefix_path);
        keys.sort();
        Ok(keys)
    }

    async fn download(&self, bucket: &str, key: &str, local_path: &Path) -> PipelineResult<()> {
        let store = self.store(bucket)?;
        let location = ObjectPath::from(key);
        let map_err = |err| PipelineError::storage(StorageOperation::Download, bucket, key, err);

        let body = store
            .get(&location)
            .await
            .map_err(map_err)?
            .bytes()
            .await
            .map_err(map_err)?;

        tokio::fs::write(local_path, &body)
            .await
            .map_err(|err| PipelineError::io(local_path, err))
    }

    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> PipelineResult<()> {
        let store = self.store(bucket)?;
        let body = tokio::fs::read(local_path)
            .await
            .map_err(|err| PipelineError::io(local_path, err))?;

        store
            .put(&ObjectPath::from(key), PutPayload::from(body))
            .await
            .map_err(|err| PipelineError::storage(StorageOperation::Upload, bucket, key, err))?;
        Ok(())
    }
}
