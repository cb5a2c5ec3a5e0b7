//! Blob storage for reference photos, generated images and style assets.
//!
//! Objects are addressed by `(bucket, path)`. [`MemoryBlobStore`] backs
//! tests, [`LocalBlobStore`] keeps objects on disk for development and
//! [`S3BlobStore`] talks to any S3-compatible service.

pub mod config;
pub mod local;
pub mod memory;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use barbcut_core::storage::{normalize_content_type, parse_storage_reference, StorageRef};

pub use config::{BlobBackend, BlobConfig};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// Object body plus the content type recorded at upload, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Object not found: {bucket}/{path}")]
    NotFound { bucket: String, path: String },

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("Unsupported storage reference: {0}")]
    UnsupportedReference(String),

    #[error("Blob store configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, bucket: &str, path: &str) -> Result<Blob, BlobError>;

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError>;

    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, BlobError>;

    /// Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BlobError>;

    /// Object paths under `prefix`, sorted.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BlobError>;
}

pub type SharedBlobStore = Arc<dyn BlobStore>;

/// An image downloaded through a stored reference.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub location: StorageRef,
    pub bytes: Vec<u8>,
    /// Always an `image/*` type.
    pub content_type: String,
}

/// Resolve a stored reference (URL, `gs://` or bare path) and download it.
pub async fn fetch_reference(
    blobs: &dyn BlobStore,
    reference: &str,
    default_bucket: &str,
) -> Result<ResolvedImage, BlobError> {
    let location = parse_storage_reference(reference, default_bucket)
        .ok_or_else(|| BlobError::UnsupportedReference(reference.to_string()))?;
    let blob = blobs.get(&location.bucket, &location.path).await?;
    let content_type =
        normalize_content_type(blob.content_type.as_deref(), &location.path, &blob.bytes);

    Ok(ResolvedImage {
        location,
        bytes: blob.bytes,
        content_type,
    })
}

/// Build the backend selected by `config`.
pub async fn connect(config: &BlobConfig) -> Result<SharedBlobStore, BlobError> {
    let store: SharedBlobStore = match config.backend {
        BlobBackend::Memory => {
            tracing::warn!("Using in-memory blob store; objects are lost on exit");
            Arc::new(MemoryBlobStore::new())
        }
        BlobBackend::Local => {
            tracing::info!(root = %config.root.display(), "Using local blob store");
            Arc::new(LocalBlobStore::new(config.root.clone()))
        }
        BlobBackend::S3 => {
            tracing::info!(endpoint = ?config.s3_endpoint, "Using S3 blob store");
            Arc::new(S3BlobStore::from_env(config.s3_endpoint.as_deref()).await)
        }
    };
    Ok(store)
}
