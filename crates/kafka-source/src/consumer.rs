use crate::error::{Result, SourceError};
use crate::reader::{RawMessage, SourceReader};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer as RdkafkaStreamConsumer};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use sync_core::Position;

/// Configuration for a single-partition Kafka reader
#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    ///
    /// Only used for client identification; offsets are never committed to
    /// the group because the pipeline checkpoint is the source of truth.
    pub group_id: String,
    /// Topic to consume from
    pub topic: String,
    /// Partition to consume from
    pub partition: i32,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Timeout for metadata requests such as watermark lookups
    pub metadata_timeout: Duration,
}

impl Default for KafkaSourceConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "city-sync".to_string(),
            topic: "".to_string(),
            partition: 0,
            session_timeout_ms: "6000".to_string(),
            metadata_timeout: Duration::from_secs(10),
        }
    }
}

/// Kafka reader with manual partition assignment
pub struct KafkaSourceReader {
    consumer: Arc<RdkafkaStreamConsumer>,
    config: KafkaSourceConfig,
}

impl KafkaSourceReader {
    /// Create a new reader. Nothing is consumed until the first `seek`.
    pub fn new(config: KafkaSourceConfig) -> Result<Self> {
        if config.topic.is_empty() {
            return Err(SourceError::InvalidConfig("topic must not be empty".into()));
        }

        let consumer: RdkafkaStreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", &config.session_timeout_ms)
            .set("enable.partition.eof", "false")
            .create()?;

        tracing::debug!(
            topic = %config.topic,
            partition = config.partition,
            brokers = %config.brokers,
            "Created Kafka source reader"
        );

        Ok(Self {
            consumer: Arc::new(consumer),
            config,
        })
    }

    fn to_raw_message(msg: &RdkafkaBorrowedMessage) -> RawMessage {
        RawMessage {
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            position: Position::new(msg.partition(), msg.offset()),
            key: msg.key().map(|k| k.to_vec()),
            timestamp_ms: msg.timestamp().to_millis(),
        }
    }

    /// Get the underlying consumer (for advanced use cases)
    pub fn inner(&self) -> &RdkafkaStreamConsumer {
        &self.consumer
    }
}

#[async_trait]
impl SourceReader for KafkaSourceReader {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawMessage>> {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(Ok(msg)) => Ok(Some(Self::to_raw_message(&msg))),
            Ok(Err(e)) => Err(SourceError::Kafka(e)),
            Err(_) => Ok(None), // Timeout, nothing available right now
        }
    }

    async fn seek(&mut self, position: Position) -> Result<()> {
        if position.partition != self.config.partition {
            return Err(SourceError::Fatal(format!(
                "position {position} is not on assigned partition {}",
                self.config.partition
            )));
        }

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &self.config.topic,
            position.partition,
            Offset::Offset(position.offset),
        )?;
        self.consumer.assign(&tpl)?;

        tracing::info!(
            topic = %self.config.topic,
            position = %position,
            "Assigned source partition"
        );
        Ok(())
    }

    async fn earliest_position(&mut self) -> Result<Position> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.config.topic.clone();
        let partition = self.config.partition;
        let timeout = self.config.metadata_timeout;

        // fetch_watermarks blocks on a broker round trip
        let (low, _high) = tokio::task::spawn_blocking(move || {
            consumer.fetch_watermarks(&topic, partition, timeout)
        })
        .await
        .map_err(|e| SourceError::Transient(format!("watermark lookup task failed: {e}")))??;

        Ok(Position::new(partition, low))
    }
}
