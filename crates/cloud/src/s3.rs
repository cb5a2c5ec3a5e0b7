//! S3-compatible blob store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{Blob, BlobError, BlobStore};

/// Buckets map one-to-one onto S3 buckets.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS environment.
    ///
    /// A custom `endpoint` switches to path-style addressing, which MinIO
    /// and the GCS interoperability API expect.
    pub async fn from_env(endpoint: Option<&str>) -> Self {
        let shared = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

fn s3_error(err: impl std::fmt::Display) -> BlobError {
    BlobError::S3(err.to_string())
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, bucket: &str, path: &str) -> Result<Blob, BlobError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    BlobError::NotFound {
                        bucket: bucket.to_string(),
                        path: path.to_string(),
                    }
                } else {
                    s3_error(e)
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let bytes = output.body.collect().await.map_err(s3_error)?.into_bytes();
        Ok(Blob {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(s3_error)?;
        tracing::debug!(bucket, path, "Uploaded object");
        Ok(())
    }

    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, BlobError> {
        match self.client.head_object().bucket(bucket).key(path).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(s3_error(e)),
        }
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), BlobError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(path)
            .send()
            .await
            .map_err(s3_error)?;
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, BlobError> {
        let mut paths = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(s3_error)?;

            paths.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(next) if output.is_truncated() == Some(true) => token = Some(next.to_string()),
                _ => break,
            }
        }

        paths.sort();
        Ok(paths)
    }
}
