//! Resume storage backends.
//!
//! `AppState` holds an `Arc<dyn ResumeStore>`, built once at startup, so
//! handlers never open their own storage connection.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 upload failed: {0}")]
    Upload(String),
}

/// A resume file ready to be written, plus the metadata stored alongside it.
#[derive(Debug, Clone)]
pub struct ResumeObject {
    pub key: String,
    pub civic_id: String,
    pub file_name: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub bytes: Bytes,
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Writes one object. Each call is a single attempt.
    async fn put(&self, object: ResumeObject) -> Result<(), StorageError>;
}

/// S3 (or S3-compatible, e.g. MinIO) backend writing into a single bucket.
pub struct S3ResumeStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ResumeStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ResumeStore for S3ResumeStore {
    async fn put(&self, object: ResumeObject) -> Result<(), StorageError> {
        let size = object.bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .body(ByteStream::from(object.bytes))
            .content_type(&object.content_type)
            .metadata("civic-id", &object.civic_id)
            .metadata("original-name", &object.file_name)
            .metadata("uploaded-at", object.uploaded_at.to_rfc3339())
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        info!(
            "Uploaded resume to s3://{}/{} ({size} bytes)",
            self.bucket, object.key
        );
        Ok(())
    }
}
