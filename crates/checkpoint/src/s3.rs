//! S3 checkpoint storage.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::store::{CheckpointError, CheckpointStore};
use crate::{checkpoint_file_name, TopicCheckpoint};

/// Checkpoints stored as S3 objects under a common prefix.
///
/// A single PUT replaces an object atomically, so no temp-object dance is needed.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    /// Create a store using credentials from the default AWS provider chain.
    pub async fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::with_client(aws_sdk_s3::Client::new(&sdk_config), bucket, prefix)
    }

    pub fn with_client(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, checkpoint_file_name(name))
    }

    fn storage_error(&self, name: &str, message: String) -> CheckpointError {
        CheckpointError::Storage {
            location: self.describe(name),
            message,
        }
    }
}

#[async_trait]
impl CheckpointStore for S3Store {
    async fn load(&self, name: &str) -> Result<Option<TopicCheckpoint>, CheckpointError> {
        let key = self.key_for(name);
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(self.storage_error(name, DisplayErrorContext(&err).to_string()));
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| self.storage_error(name, e.to_string()))?
            .into_bytes();

        let checkpoint = TopicCheckpoint::from_bytes(name, &bytes)?;
        tracing::debug!(
            name,
            bucket = %self.bucket,
            key = %key,
            position = %checkpoint.last_acked_position,
            "Loaded checkpoint from S3"
        );
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &TopicCheckpoint) -> Result<(), CheckpointError> {
        let name = checkpoint.key();
        let name = name.as_str();
        let key = self.key_for(name);
        let bytes = checkpoint.to_bytes()?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| self.storage_error(name, DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(
            name,
            bucket = %self.bucket,
            key = %key,
            position = %checkpoint.last_acked_position,
            "Stored checkpoint in S3"
        );
        Ok(())
    }

    fn describe(&self, name: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.key_for(name))
    }
}
