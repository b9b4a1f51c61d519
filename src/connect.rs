//! Connector wiring: Kafka sources and Parquet sinks.

use crate::config::AppConfig;
use async_trait::async_trait;
use city_sync_file_sink::{ParquetSink, SinkError, SinkLocation, SinkWriter};
use city_sync_kafka_source::{KafkaSourceConfig, KafkaSourceReader, SourceError, SourceReader};
use city_sync_pipeline::{ConnectorFactory, TopicConfig};
use std::sync::Arc;
use std::time::Duration;
use sync_core::{RetryPolicy, Schema};

/// Opens a single-partition Kafka reader and a Parquet sink per pipeline.
///
/// Partitions of one topic share its sink location; file names carry the
/// partition, so they never collide.
pub struct KafkaParquetFactory {
    brokers: String,
    group_id: String,
    session_timeout_ms: u64,
    sink_root: SinkLocation,
    sink_retry: RetryPolicy,
}

impl KafkaParquetFactory {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            brokers: config.bus_endpoint.clone(),
            group_id: config.group_id.clone(),
            session_timeout_ms: config.session_timeout_ms,
            sink_root: config.sink_root_location()?,
            sink_retry: config.sink_retry_policy(),
        })
    }

    /// Explicit `sink_location`, or `<sink_root>/<topic>/`.
    pub fn sink_location(&self, topic: &TopicConfig) -> Result<SinkLocation, SinkError> {
        match &topic.sink_location {
            Some(location) => SinkLocation::parse(location),
            None => Ok(self.sink_root.join(&topic.name)),
        }
    }
}

#[async_trait]
impl ConnectorFactory for KafkaParquetFactory {
    async fn open_source(&self, topic: &TopicConfig) -> Result<Box<dyn SourceReader>, SourceError> {
        let reader = KafkaSourceReader::new(KafkaSourceConfig {
            brokers: self.brokers.clone(),
            group_id: self.group_id.clone(),
            topic: topic.name.clone(),
            partition: topic.partition,
            session_timeout_ms: self.session_timeout_ms.to_string(),
            metadata_timeout: Duration::from_secs(10),
        })?;
        Ok(Box::new(reader))
    }

    async fn open_sink(
        &self,
        topic: &TopicConfig,
        schema: Arc<Schema>,
    ) -> Result<Box<dyn SinkWriter>, SinkError> {
        let location = self.sink_location(topic)?;
        tracing::info!(
            topic = %topic.name,
            location = %location.display_name(),
            "Opening Parquet sink"
        );
        let sink = ParquetSink::open(&topic.name, schema, location, self.sink_retry).await;
        Ok(Box::new(sink))
    }
}
