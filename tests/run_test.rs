//! Whole-stack run: in-memory source, real Parquet sink, filesystem checkpoints.

use async_trait::async_trait;
use city_sync::sync::run_with_factory;
use city_sync::AppConfig;
use city_sync_file_sink::{ParquetSink, SinkError, SinkWriter};
use city_sync_kafka_source::{RawMessage, SourceError, SourceReader};
use city_sync_pipeline::{ConnectorFactory, PipelineState, TopicConfig};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sync_core::{Position, RetryPolicy, Schema};

struct FixedSource {
    messages: VecDeque<RawMessage>,
}

#[async_trait]
impl SourceReader for FixedSource {
    async fn poll(
        &mut self,
        timeout: Duration,
    ) -> city_sync_kafka_source::error::Result<Option<RawMessage>> {
        match self.messages.pop_front() {
            Some(m) => Ok(Some(m)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn seek(&mut self, position: Position) -> city_sync_kafka_source::error::Result<()> {
        self.messages.retain(|m| m.position >= position);
        Ok(())
    }

    async fn earliest_position(&mut self) -> city_sync_kafka_source::error::Result<Position> {
        Ok(Position::new(0, 0))
    }
}

struct LocalConnectors {
    sink_root: PathBuf,
}

#[async_trait]
impl ConnectorFactory for LocalConnectors {
    async fn open_source(&self, topic: &TopicConfig) -> Result<Box<dyn SourceReader>, SourceError> {
        let payloads: Vec<String> = match topic.name.as_str() {
            "gps_data" => vec![
                r#"{"id":"g0","vehicle_id":"v-1","timestamp":"2024-01-01T10:00:00Z","speed":31.5}"#.into(),
                r#"{"id":"g1","vehicle_id":"v-1","timestamp":"2024-01-01 10:00:05","speed":33}"#.into(),
                "not json".into(),
            ],
            "emergency_data" => vec![
                r#"{"id":"e0","timestamp":1704103200000,"type":"fire","status":"active"}"#.into(),
            ],
            other => return Err(SourceError::Fatal(format!("no data for {other}"))),
        };
        let messages = payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| RawMessage::new(p.into_bytes(), Position::new(0, i as i64)))
            .collect();
        Ok(Box::new(FixedSource { messages }))
    }

    async fn open_sink(
        &self,
        topic: &TopicConfig,
        schema: Arc<Schema>,
    ) -> Result<Box<dyn SinkWriter>, SinkError> {
        Ok(Box::new(ParquetSink::local(
            &topic.name,
            schema,
            self.sink_root.join(&topic.name),
            RetryPolicy::default(),
        )))
    }
}

fn config(checkpoints: &Path, sink_root: &Path) -> AppConfig {
    AppConfig::from_toml(&format!(
        r#"
        checkpoint_location = "{}"
        sink_root = "{}"
        poll_timeout = "5ms"

        [[topics]]
        name = "gps_data"

        [[topics]]
        name = "emergency_data"
        "#,
        checkpoints.display(),
        sink_root.display()
    ))
    .unwrap()
}

#[tokio::test]
async fn test_run_writes_parquet_and_checkpoints() {
    let checkpoints = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let config = config(checkpoints.path(), data.path());
    let factory = Arc::new(LocalConnectors {
        sink_root: data.path().to_path_buf(),
    });

    let report = run_with_factory(&config, factory, |token| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    })
    .await
    .unwrap();

    assert_eq!(report.exit_code(), 0);
    let gps = report.outcome("gps_data-0").unwrap();
    assert_eq!(gps.state, PipelineState::Stopped);
    assert_eq!(gps.metrics.records_written, 2);
    assert_eq!(gps.metrics.decode_failures, 1);

    assert!(data
        .path()
        .join("gps_data")
        .join("part-0-0-2.parquet")
        .exists());
    assert!(data
        .path()
        .join("emergency_data")
        .join("part-0-0-0.parquet")
        .exists());

    let stored = std::fs::read_to_string(checkpoints.path().join("gps_data-0.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["last_acked_position"]["offset"], 2);
}

#[tokio::test]
async fn test_restart_resumes_after_checkpoint() {
    let checkpoints = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let config = config(checkpoints.path(), data.path());

    for _ in 0..2 {
        let factory = Arc::new(LocalConnectors {
            sink_root: data.path().to_path_buf(),
        });
        let report = run_with_factory(&config, factory, |token| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        })
        .await
        .unwrap();
        assert!(report.is_success());
    }

    // The second run resumed at 0@3 and found nothing new to write
    let files: Vec<_> = std::fs::read_dir(data.path().join("gps_data"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, vec!["part-0-0-2.parquet"]);
}
