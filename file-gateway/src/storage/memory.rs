//! Process-local object store
//!
//! Backs `STORAGE_BACKEND=memory` and the handler tests. Listing mirrors a
//! single S3 page: lexicographic key order, at most [`LIST_PAGE_SIZE`] keys.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::RwLock;

use super::{ObjectBody, ObjectStore, StorageError, StorageResult, STREAM_CHUNK_SIZE};

/// Keys returned by one listing call
pub const LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored object, bypassing the streaming read path
    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Bytes, content_type: Option<String>) -> StorageResult<()> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), StoredObject { body, content_type });
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<ObjectBody> {
        let object = self
            .object(key)
            .await
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let body = object.body;
        let content_length = body.len() as u64;
        let chunks: Vec<std::io::Result<Bytes>> = (0..body.len())
            .step_by(STREAM_CHUNK_SIZE)
            .map(|start| Ok(body.slice(start..(start + STREAM_CHUNK_SIZE).min(body.len()))))
            .collect();

        Ok(ObjectBody {
            content_type: object.content_type,
            content_length: Some(content_length),
            stream: futures::stream::iter(chunks).boxed(),
        })
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .take(LIST_PAGE_SIZE)
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_put_get_roundtrip_streams_in_chunks() {
        let store = MemoryStore::new();
        let data = Bytes::from(vec![7u8; STREAM_CHUNK_SIZE * 2 + 10]);
        store
            .put("uploads/big.bin", data.clone(), Some("image/png".to_string()))
            .await
            .unwrap();

        let object = store.get("uploads/big.bin").await.unwrap();
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
        assert_eq!(object.content_length, Some(data.len() as u64));

        let chunks: Vec<Bytes> = object.stream.try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), data.to_vec());
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemoryStore::new();
        let err = store.get("uploads/nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(key) if key == "uploads/nope"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.put("a", Bytes::from_static(b"x"), None).await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_list_is_single_page() {
        let store = MemoryStore::new();
        for i in 0..(LIST_PAGE_SIZE + 5) {
            store
                .put(&format!("uploads/{:05}", i), Bytes::new(), None)
                .await
                .unwrap();
        }
        let keys = store.list().await.unwrap();
        assert_eq!(keys.len(), LIST_PAGE_SIZE);
        assert_eq!(keys[0], "uploads/00000");
    }
}
