use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Blob, BlobError, BlobStore};

/// Blob store held in a map keyed by `(bucket, path)`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<(String, String), Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, path: &str) -> Result<Blob, BlobError> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.objects.write().await.insert(
            (bucket.to_string(), path.to_string()),
            Blob {
                bytes,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, BlobError> {
        Ok(self
            .objects
            .read()
            .await
            .contains_key(&(bucket.to_string(), path.to_string())))
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BlobError> {
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), path.to_string()));
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BlobError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, p)| b == bucket && p.starts_with(prefix))
            .map(|(_, p)| p.clone())
            .collect())
    }
}
