//! Parquet implementation of [`SinkWriter`].

use crate::columnar::encode_batch;
use crate::error::SinkError;
use crate::local::LocalFileWriter;
use crate::location::SinkLocation;
use crate::s3::S3Client;
use crate::writer::{BatchPosition, SinkWriter};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use sync_core::{Record, RetryPolicy, Schema};
use tokio::time::sleep;

enum Target {
    Local(PathBuf),
    S3 {
        client: S3Client,
        bucket: String,
        prefix: String,
    },
}

/// Writes each batch as one Parquet file under the topic's location.
pub struct ParquetSink {
    topic: String,
    schema: Arc<Schema>,
    target: Target,
    retry: RetryPolicy,
}

impl ParquetSink {
    /// Open a sink, creating an S3 client from the default provider chain when needed.
    pub async fn open(
        topic: impl Into<String>,
        schema: Arc<Schema>,
        location: SinkLocation,
        retry: RetryPolicy,
    ) -> Self {
        let target = match location {
            SinkLocation::Local(dir) => Target::Local(dir),
            SinkLocation::S3 { bucket, prefix } => Target::S3 {
                client: S3Client::new().await,
                bucket,
                prefix,
            },
        };
        Self {
            topic: topic.into(),
            schema,
            target,
            retry,
        }
    }

    /// Local-only sink; needs no AWS configuration.
    pub fn local(
        topic: impl Into<String>,
        schema: Arc<Schema>,
        dir: impl Into<PathBuf>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            topic: topic.into(),
            schema,
            target: Target::Local(dir.into()),
            retry,
        }
    }

    fn describe(&self, name: &str) -> String {
        match &self.target {
            Target::Local(dir) => dir.join(name).display().to_string(),
            Target::S3 { bucket, prefix, .. } => format!("s3://{bucket}/{prefix}{name}"),
        }
    }

    async fn store(&self, name: &str, contents: &[u8]) -> Result<(), SinkError> {
        match &self.target {
            Target::Local(dir) => LocalFileWriter::write(dir, name, contents).await.map(|_| ()),
            Target::S3 {
                client,
                bucket,
                prefix,
            } => {
                client
                    .put(bucket, &format!("{prefix}{name}"), contents.to_vec())
                    .await
            }
        }
    }
}

#[async_trait]
impl SinkWriter for ParquetSink {
    async fn write_batch(
        &mut self,
        records: &[Record],
        position: BatchPosition,
    ) -> Result<(), SinkError> {
        let contents = encode_batch(&self.schema, records)?;
        let name = position.file_name("parquet");
        let location = self.describe(&name);

        let mut last_error: Option<SinkError> = None;
        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                tracing::warn!(
                    topic = %self.topic,
                    "Retrying batch write to {} (attempt {}/{}), waiting {}ms",
                    location,
                    attempt,
                    self.retry.max_retries,
                    delay.as_millis()
                );
                sleep(delay).await;
            }

            match self.store(&name, &contents).await {
                Ok(()) => {
                    tracing::info!(
                        topic = %self.topic,
                        records = records.len(),
                        bytes = contents.len(),
                        range = %position,
                        "Wrote batch to {}",
                        location
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(topic = %self.topic, "Batch write failed: {e}");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        // All retries exhausted
        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        tracing::error!(
            topic = %self.topic,
            "Failed to write batch to {} after {} retries. Last error: {}",
            location,
            self.retry.max_retries,
            last_error
        );
        Err(SinkError::RetriesExhausted {
            location,
            attempts: self.retry.max_retries + 1,
            last_error,
        })
    }
}
