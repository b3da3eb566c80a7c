//! AWS S3 backup target.
//!
//! Uploads the serialized history as one object, overwriting the previous
//! backup.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::storage::RemoteSync;

/// S3 object holding the latest history backup.
#[derive(Clone)]
pub struct S3Backup {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Backup {
    /// Create a new S3 backup target.
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create a backup target using the default AWS credential chain.
    pub async fn from_env(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket, key)
    }
}

#[async_trait]
impl RemoteSync for S3Backup {
    async fn sync_remote(&self, bytes: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::sync(self.target(), e.into_service_error()))?;

        log::info!("Wrote {} bytes to {}", bytes.len(), self.target());
        Ok(())
    }

    fn target(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}
