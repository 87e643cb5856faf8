//! Object storage access.
//!
//! Stages and the harness only see the [`StorageGateway`] trait. The
//! production implementation is [`ObjectStoreGateway`], which builds one
//! `object_store` client per bucket.

mod gateway;
mod transfer;

pub use gateway::{ObjectStoreGateway, StorageGateway, StoreFactory};
pub use transfer::{download_prefix, object_keys, upload_directory};

#[cfg(test)]
pub use gateway::MockStorageGateway;
