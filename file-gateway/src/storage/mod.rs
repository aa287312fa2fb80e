//! Object storage layer
//!
//! Handlers talk to an [`ObjectStore`]; the process holds exactly one, built
//! at startup from [`crate::config::StorageConfig`].

pub mod keys;
pub mod memory;
pub mod s3_client;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

pub use keys::PublicUrlBuilder;
pub use memory::MemoryStore;
pub use s3_client::S3Client;

/// Read buffer size used when relaying object bodies
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("The specified key does not exist: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Streamed object body. Chunks are pulled on demand.
pub type ObjectStream = BoxStream<'static, std::io::Result<Bytes>>;

/// An object being read from the store
pub struct ObjectBody {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub stream: ObjectStream,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Put/get/list/delete over a single bucket
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing anything already there.
    async fn put(&self, key: &str, body: Bytes, content_type: Option<String>) -> StorageResult<()>;

    /// Open `key` for reading. Fails before any byte is produced if the key is missing.
    async fn get(&self, key: &str) -> StorageResult<ObjectBody>;

    /// One page of keys across the whole bucket.
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// Remove `key`. Succeeds whether or not the key existed.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Build the process-wide store for the configured backend
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    tracing::debug!(backend = config.backend.as_str(), "Connecting object storage");
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::S3 => Arc::new(S3Client::new(config).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage backend; files are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
