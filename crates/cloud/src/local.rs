//! Filesystem-backed blob store: `{root}/{bucket}/{path}`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use barbcut_core::storage::infer_content_type;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::{Blob, BlobError, BlobStore};

/// Content types are not persisted; reads infer them from the extension.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf, BlobError> {
        let mut full = self.root.clone();
        for part in [bucket, path] {
            let relative = Path::new(part);
            let is_plain = !part.is_empty()
                && relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !is_plain {
                return Err(BlobError::InvalidPath(format!("{bucket}/{path}")));
            }
            full.push(relative);
        }
        Ok(full)
    }
}

fn not_found_as(err: std::io::Error, bucket: &str, path: &str) -> BlobError {
    if err.kind() == std::io::ErrorKind::NotFound {
        BlobError::NotFound {
            bucket: bucket.to_string(),
            path: path.to_string(),
        }
    } else {
        BlobError::Io(err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, bucket: &str, path: &str) -> Result<Blob, BlobError> {
        let file = self.resolve(bucket, path)?;
        let bytes = fs::read(&file)
            .await
            .map_err(|e| not_found_as(e, bucket, path))?;
        Ok(Blob {
            bytes,
            content_type: Some(infer_content_type(path).to_string()),
        })
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), BlobError> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&target).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, BlobError> {
        let target = self.resolve(bucket, path)?;
        Ok(fs::try_exists(&target).await?)
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BlobError> {
        let target = self.resolve(bucket, path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BlobError> {
        let bucket_root = self.root.join(bucket);
        let mut pending = vec![bucket_root.clone()];
        let mut paths = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let full = entry.path();
                if file_type.is_dir() {
                    pending.push(full);
                } else if let Ok(relative) = full.strip_prefix(&bucket_root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        paths.push(key);
                    }
                }
            }
        }

        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let store = LocalBlobStore::new(PathBuf::from("/tmp/unused"));
        assert_matches!(
            store.get("bucket", "../etc/passwd").await,
            Err(BlobError::InvalidPath(_))
        );
        assert_matches!(store.get("", "a.png").await, Err(BlobError::InvalidPath(_)));
        assert_matches!(store.get("b", "/abs.png").await, Err(BlobError::InvalidPath(_)));
    }
}
