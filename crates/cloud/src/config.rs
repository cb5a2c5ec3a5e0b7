use std::path::PathBuf;

use crate::BlobError;

/// Bucket used when a reference or upload names none.
pub const DEFAULT_BUCKET: &str = "barb-cut.appspot.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Memory,
    Local,
    S3,
}

impl std::str::FromStr for BlobBackend {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(BlobError::Config(format!(
                "BLOB_BACKEND must be one of local, s3, memory (got '{other}')"
            ))),
        }
    }
}

/// Blob store settings shared by every binary.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub backend: BlobBackend,
    /// Root directory of the local backend.
    pub root: PathBuf,
    /// Default bucket for generated images and migration uploads.
    pub bucket: String,
    /// Custom S3 endpoint (MinIO, GCS interop).
    pub s3_endpoint: Option<String>,
}

impl BlobConfig {
    /// Load from environment variables.
    ///
    /// | Env var           | Default                |
    /// |-------------------|------------------------|
    /// | `BLOB_BACKEND`    | `local`                |
    /// | `BLOB_ROOT`       | `./data/blobs`         |
    /// | `BLOB_BUCKET`     | `barb-cut.appspot.com` |
    /// | `S3_ENDPOINT_URL` | unset                  |
    pub fn from_env() -> Result<Self, BlobError> {
        let backend = match std::env::var("BLOB_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => BlobBackend::Local,
        };

        Ok(Self {
            backend,
            root: std::env::var("BLOB_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/blobs")),
            bucket: std::env::var("BLOB_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            s3_endpoint: std::env::var("S3_ENDPOINT_URL").ok().filter(|v| !v.is_empty()),
        })
    }

    /// In-memory store with the default bucket.
    pub fn memory() -> Self {
        Self {
            backend: BlobBackend::Memory,
            root: PathBuf::new(),
            bucket: DEFAULT_BUCKET.to_string(),
            s3_endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_parse() {
        assert_eq!("S3".parse::<BlobBackend>().unwrap(), BlobBackend::S3);
        assert_eq!(" local ".parse::<BlobBackend>().unwrap(), BlobBackend::Local);
        assert!("gcs".parse::<BlobBackend>().is_err());
    }
}
