//! S3 object writer

use crate::error::SinkError;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

/// Shared S3 client for efficient operations
///
/// Creating an S3 client is relatively expensive, so a sink creates one at
/// startup and reuses it for every batch.
#[derive(Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the default AWS provider chain
    pub async fn new() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::from_client(aws_sdk_s3::Client::new(&sdk_config))
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Upload `contents` as one object, replacing any existing object
    pub async fn put(&self, bucket: &str, key: &str, contents: Vec<u8>) -> Result<(), SinkError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(contents))
            .send()
            .await
            .map_err(|e| SinkError::Storage {
                location: format!("s3://{bucket}/{key}"),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!("Uploaded object to S3: s3://{}/{}", bucket, key);
        Ok(())
    }
}
