//! In-memory sources, sinks and stores for pipeline tests.
#![allow(dead_code)]

use async_trait::async_trait;
use checkpoint::{CheckpointError, CheckpointStore, MemoryStore, TopicCheckpoint};
use city_sync_file_sink::{BatchPosition, SinkError, SinkWriter};
use city_sync_kafka_source::{RawMessage, SourceError, SourceReader};
use city_sync_pipeline::{
    ConnectorFactory, DecodeFailureThreshold, PipelineHandle, PipelineSettings, TopicConfig,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_core::{Position, Record, RecordValue, Schema};

// ============================================================================
// Source
// ============================================================================

/// Append-only message log of one topic partition.
#[derive(Clone, Default)]
pub struct TopicLog {
    partition: i32,
    messages: Arc<Mutex<Vec<RawMessage>>>,
    seeks: Arc<Mutex<Vec<Position>>>,
}

impl TopicLog {
    /// Log of partition 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(partition: i32) -> Self {
        Self {
            partition,
            ..Self::default()
        }
    }

    pub fn push(&self, payload: impl Into<Vec<u8>>) -> Position {
        let mut messages = self.messages.lock().unwrap();
        let position = Position::new(self.partition, messages.len() as i64);
        messages.push(RawMessage::new(payload, position));
        position
    }

    pub fn reader(&self) -> LogReader {
        LogReader {
            log: self.clone(),
            next: 0,
        }
    }

    /// Every position a reader of this log was asked to seek to.
    pub fn seeks(&self) -> Vec<Position> {
        self.seeks.lock().unwrap().clone()
    }
}

pub struct LogReader {
    log: TopicLog,
    next: i64,
}

#[async_trait]
impl SourceReader for LogReader {
    async fn poll(
        &mut self,
        timeout: Duration,
    ) -> city_sync_kafka_source::error::Result<Option<RawMessage>> {
        let message = {
            let messages = self.log.messages.lock().unwrap();
            messages
                .iter()
                .find(|m| m.position.offset >= self.next)
                .cloned()
        };
        match message {
            Some(m) => {
                self.next = m.position.offset + 1;
                Ok(Some(m))
            }
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn seek(&mut self, position: Position) -> city_sync_kafka_source::error::Result<()> {
        self.log.seeks.lock().unwrap().push(position);
        self.next = position.offset;
        Ok(())
    }

    async fn earliest_position(&mut self) -> city_sync_kafka_source::error::Result<Position> {
        Ok(Position::new(self.log.partition, 0))
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Sink that keeps every confirmed batch in memory.
#[derive(Clone, Default)]
pub struct RecordingSink {
    batches: Arc<Mutex<Vec<(BatchPosition, Vec<Record>)>>>,
    fail: Arc<AtomicBool>,
    hang: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write give up.
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every following write block forever.
    pub fn hang_writes(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn ranges(&self) -> Vec<BatchPosition> {
        self.batches.lock().unwrap().iter().map(|(r, _)| *r).collect()
    }

    /// `id` of every written record, in write order.
    pub fn ids(&self) -> Vec<String> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, records)| records.iter())
            .filter_map(|r| match r.get("id") {
                Some(RecordValue::String(id)) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SinkWriter for RecordingSink {
    async fn write_batch(
        &mut self,
        records: &[Record],
        position: BatchPosition,
    ) -> Result<(), SinkError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::RetriesExhausted {
                location: "memory".to_string(),
                attempts: 1,
                last_error: "injected failure".to_string(),
            });
        }
        self.batches
            .lock()
            .unwrap()
            .push((position, records.to_vec()));
        Ok(())
    }
}

// ============================================================================
// Checkpoint store
// ============================================================================

/// Memory store that starts rejecting saves after a number of successful ones.
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    saves_left: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, saves_allowed: usize) -> Self {
        Self {
            inner,
            saves_left: Arc::new(AtomicUsize::new(saves_allowed)),
        }
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn load(&self, key: &str) -> Result<Option<TopicCheckpoint>, CheckpointError> {
        self.inner.load(key).await
    }

    async fn save(&self, checkpoint: &TopicCheckpoint) -> Result<(), CheckpointError> {
        let allowed = self
            .saves_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(CheckpointError::Storage {
                location: self.describe(&checkpoint.key()),
                message: "injected failure".to_string(),
            });
        }
        self.inner.save(checkpoint).await
    }

    fn describe(&self, key: &str) -> String {
        self.inner.describe(key)
    }
}

// ============================================================================
// Connector factory
// ============================================================================

#[derive(Default)]
pub struct TestConnectors {
    logs: HashMap<(String, i32), TopicLog>,
    sinks: HashMap<String, RecordingSink>,
    broken_sources: HashSet<String>,
}

impl TestConnectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `log` as its partition of `topic`; every partition of a topic
    /// writes to the same sink.
    pub fn with_topic(mut self, topic: &str, log: &TopicLog, sink: &RecordingSink) -> Self {
        self.logs
            .insert((topic.to_string(), log.partition), log.clone());
        self.sinks.insert(topic.to_string(), sink.clone());
        self
    }

    /// Opening the source of `topic` fails.
    pub fn with_broken_source(mut self, topic: &str) -> Self {
        self.broken_sources.insert(topic.to_string());
        self
    }
}

#[async_trait]
impl ConnectorFactory for TestConnectors {
    async fn open_source(
        &self,
        topic: &TopicConfig,
    ) -> Result<Box<dyn SourceReader>, SourceError> {
        if self.broken_sources.contains(&topic.name) {
            return Err(SourceError::Fatal(format!("broker refused {}", topic.name)));
        }
        self.logs
            .get(&(topic.name.clone(), topic.partition))
            .map(|log| Box::new(log.reader()) as Box<dyn SourceReader>)
            .ok_or_else(|| SourceError::Fatal(format!("no log for {}", topic.pipeline_name())))
    }

    async fn open_sink(
        &self,
        topic: &TopicConfig,
        _schema: Arc<Schema>,
    ) -> Result<Box<dyn SinkWriter>, SinkError> {
        self.sinks
            .get(&topic.name)
            .map(|sink| Box::new(sink.clone()) as Box<dyn SinkWriter>)
            .ok_or_else(|| SinkError::InvalidLocation(topic.name.clone()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        poll_timeout: Duration::from_millis(5),
        drain_timeout: Duration::from_secs(5),
        source_retry: sync_core::RetryPolicy::new(2, Duration::from_millis(1)),
        decode_failure_threshold: DecodeFailureThreshold::default(),
    }
}

/// Topic config with batches that only close on size or stop.
pub fn topic(name: &str, max_batch_size: usize) -> TopicConfig {
    let mut config = TopicConfig::new(name);
    config.max_batch_size = max_batch_size;
    config.max_batch_duration = Duration::from_secs(3600);
    config
}

pub fn gps(id: &str, timestamp: &str) -> String {
    format!(
        r#"{{"id":"{id}","vehicle_id":"v-1","timestamp":"{timestamp}","speed":42.5,"direction":"N","vehicleType":"car"}}"#
    )
}

pub fn weather(id: &str, timestamp: &str) -> String {
    format!(r#"{{"id":"{id}","timestamp":"{timestamp}","temperature":12.5,"humidity":80}}"#)
}

/// Poll `condition` until it holds; panics after five seconds.
pub async fn wait_until(handle: &PipelineHandle, condition: impl Fn(&PipelineHandle) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition(handle) {
        if tokio::time::Instant::now() > deadline {
            panic!(
                "timed out waiting on pipeline {} (state {}, metrics {:?})",
                handle.name(),
                handle.state(),
                handle.metrics()
            );
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
