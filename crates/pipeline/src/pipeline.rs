//! The per-partition pipeline: pull, decode, watermark, batch, flush, checkpoint.

use crate::batch::Batch;
use crate::config::{PipelineSettings, TopicConfig};
use crate::error::PipelineError;
use crate::handle::{PipelineControl, PipelineHandle, PipelineOutcome, PipelineState};
use crate::health::{DecodeHealth, Health};
use crate::metrics::PipelineMetrics;
use crate::watermark::{Admission, WatermarkTracker};
use checkpoint::{CheckpointStore, TopicCheckpoint};
use chrono::{DateTime, Utc};
use city_sync_file_sink::{BatchPosition, SinkWriter};
use city_sync_kafka_source::{RawMessage, SourceReader};
use std::sync::Arc;
use std::time::Duration;
use sync_core::{Record, TopicDescriptor};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};

/// Writes a closed batch and then commits its checkpoint.
///
/// Cloneable so each flush runs as its own task.
#[derive(Clone)]
struct Committer {
    topic: String,
    /// Checkpoint key, `<topic>-<partition>`
    key: String,
    sink: Arc<Mutex<Box<dyn SinkWriter>>>,
    store: Arc<dyn CheckpointStore>,
    metrics: Arc<PipelineMetrics>,
}

impl Committer {
    /// Sink first, checkpoint strictly after the sink confirmed the write.
    async fn commit(
        &self,
        records: Vec<Record>,
        range: BatchPosition,
        watermark: Option<DateTime<Utc>>,
    ) -> Result<(), PipelineError> {
        // A range of only skipped messages has nothing to write
        if !records.is_empty() {
            self.sink.lock().await.write_batch(&records, range).await?;
            self.metrics.record_flush(records.len());
        }

        let checkpoint = TopicCheckpoint::new(&self.topic, range.last, watermark);
        self.store
            .save(&checkpoint)
            .await
            .map_err(PipelineError::Checkpoint)?;
        self.metrics.set_checkpoint(range.last);

        tracing::info!(
            topic = %self.topic,
            records = records.len(),
            range = %range,
            location = %self.store.describe(&self.key),
            "Committed batch"
        );
        Ok(())
    }
}

/// One long-running pipeline for one partition of a topic.
///
/// Owns its source, sink, watermark and batch; shares nothing with other
/// pipelines except the checkpoint store, where it only touches its own key.
/// Partitions of the same topic run as separate pipelines with separate
/// watermarks.
pub struct TopicPipeline {
    topic: TopicDescriptor,
    max_batch_size: usize,
    max_batch_duration: Duration,
    settings: PipelineSettings,
    source: Box<dyn SourceReader>,
    committer: Committer,
    control: PipelineControl,
    tracker: WatermarkTracker,
    batch: Batch,
    health: DecodeHealth,
}

impl TopicPipeline {
    pub fn new(
        topic: TopicDescriptor,
        config: &TopicConfig,
        settings: PipelineSettings,
        source: Box<dyn SourceReader>,
        sink: Box<dyn SinkWriter>,
        store: Arc<dyn CheckpointStore>,
        control: PipelineControl,
    ) -> Self {
        let committer = Committer {
            topic: topic.name.clone(),
            key: config.pipeline_name(),
            sink: Arc::new(Mutex::new(sink)),
            store,
            metrics: Arc::clone(control.metrics()),
        };
        let threshold = settings.decode_failure_threshold;
        Self {
            tracker: WatermarkTracker::new(topic.allowed_lateness),
            max_batch_size: config.max_batch_size.max(1),
            max_batch_duration: config.max_batch_duration,
            topic,
            settings,
            source,
            committer,
            control,
            batch: Batch::new(),
            health: DecodeHealth::new(threshold.ratio, threshold.window),
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.control.handle()
    }

    /// Run until stopped or failed. Never panics on pipeline errors; the
    /// outcome carries the cause instead.
    pub async fn run(mut self) -> PipelineOutcome {
        let result = match self.start_and_run().await {
            Ok(()) => {
                self.control.transition(PipelineState::Draining);
                self.drain().await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.control.transition(PipelineState::Stopped);
                self.control.outcome(None)
            }
            Err(e) => self.control.fail(e),
        }
    }

    async fn start_and_run(&mut self) -> Result<(), PipelineError> {
        self.start().await?;
        self.control.transition(PipelineState::Running);
        self.run_loop().await
    }

    // ========================================================================
    // STARTING
    // ========================================================================

    async fn start(&mut self) -> Result<(), PipelineError> {
        let name = self.committer.key.clone();
        match self.committer.store.load(&name).await? {
            Some(checkpoint) => {
                self.tracker =
                    WatermarkTracker::resume(self.topic.allowed_lateness, checkpoint.watermark_value);
                let metrics = self.control.metrics();
                metrics.set_checkpoint(checkpoint.last_acked_position);
                metrics.set_watermark(checkpoint.watermark_value);

                let resume = checkpoint.resume_position();
                tracing::info!(
                    pipeline = %name,
                    position = %resume,
                    watermark = ?checkpoint.watermark_value,
                    "Resuming from checkpoint"
                );
                self.source.seek(resume).await?;
            }
            None => {
                let earliest = self.source.earliest_position().await?;
                tracing::info!(
                    pipeline = %name,
                    position = %earliest,
                    "No checkpoint found, starting from earliest position"
                );
                self.source.seek(earliest).await?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // RUNNING
    // ========================================================================

    async fn run_loop(&mut self) -> Result<(), PipelineError> {
        loop {
            // Stop requests are only observed here, between messages
            if self.control.stop_requested() {
                tracing::info!(topic = %self.topic.name, "Stop requested");
                return Ok(());
            }

            if self
                .batch
                .should_close(self.max_batch_size, self.max_batch_duration)
            {
                self.flush().await?;
            }

            let timeout = self
                .batch
                .remaining(self.max_batch_duration)
                .map_or(self.settings.poll_timeout, |left| {
                    left.min(self.settings.poll_timeout)
                });

            if let Some(message) = self.poll_with_retry(timeout).await? {
                self.process(message);
            }
        }
    }

    async fn poll_with_retry(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RawMessage>, PipelineError> {
        let policy = self.settings.source_retry;
        let mut attempt = 0;
        loop {
            match self.source.poll(timeout).await {
                Ok(message) => return Ok(message),
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        topic = %self.topic.name,
                        "Retrying source poll (attempt {}/{}), waiting {}ms: {}",
                        attempt,
                        policy.max_retries,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(PipelineError::Source(e)),
            }
        }
    }

    /// Decode, watermark and batch one message. Per-message failures are
    /// counted and skipped, never returned.
    fn process(&mut self, message: RawMessage) {
        let metrics = Arc::clone(self.control.metrics());
        metrics.inc_consumed();
        let position = message.position;

        let record = match json_types::decode(&message.payload, &self.topic.schema) {
            Ok(record) => record,
            Err(e) => {
                metrics.inc_decode_failures();
                tracing::warn!(
                    topic = %self.topic.name,
                    position = %position,
                    reason = %e.reason,
                    raw = %e.raw_excerpt,
                    "Skipping malformed message"
                );
                self.observe_decode(true);
                self.batch.skip(position);
                return;
            }
        };

        let Some(event_time) = record.event_time(&self.topic.watermark_field) else {
            metrics.inc_decode_failures();
            tracing::warn!(
                topic = %self.topic.name,
                position = %position,
                field = %self.topic.watermark_field,
                "Skipping message without event time"
            );
            self.observe_decode(true);
            self.batch.skip(position);
            return;
        };
        self.observe_decode(false);

        match self.tracker.observe(event_time) {
            Admission::Admitted => self.batch.push(record, position),
            Admission::Late { watermark } => {
                metrics.inc_late_drops();
                tracing::debug!(
                    topic = %self.topic.name,
                    position = %position,
                    event_time = %event_time,
                    watermark = %watermark,
                    record = %json_types::JsonValue::from(&record).into_inner(),
                    "Dropping late record"
                );
                self.batch.skip(position);
            }
        }
        metrics.set_watermark(self.tracker.current());
    }

    fn observe_decode(&mut self, failed: bool) {
        if let Some(health) = self.health.record(failed) {
            self.control.metrics().set_health(health);
            match health {
                Health::Degraded => tracing::warn!(
                    topic = %self.topic.name,
                    ratio = self.health.ratio(),
                    "Decode failure ratio above threshold, pipeline degraded"
                ),
                Health::Healthy => tracing::info!(
                    topic = %self.topic.name,
                    ratio = self.health.ratio(),
                    "Decode failure ratio recovered"
                ),
            }
        }
    }

    /// Commit the closed batch as its own task.
    ///
    /// A stop that arrives while the write is in flight switches to the drain
    /// budget: the write gets `drain_timeout` to finish, and is never cut short.
    async fn flush(&mut self) -> Result<(), PipelineError> {
        let Some(mut task) = self.spawn_commit() else {
            return Ok(());
        };

        tokio::select! {
            joined = &mut task => return Self::joined(joined),
            _ = self.control.stopped() => {}
        }

        tracing::info!(
            topic = %self.topic.name,
            "Stop requested during flush, waiting for the in-flight write"
        );
        self.control.transition(PipelineState::Draining);
        Self::await_within_drain(self.settings.drain_timeout, task).await
    }

    // ========================================================================
    // DRAINING
    // ========================================================================

    /// Flush the open batch within the drain budget.
    ///
    /// On timeout the pipeline reports `FAILED` but the in-flight write is
    /// left to finish.
    async fn drain(&mut self) -> Result<(), PipelineError> {
        let Some(task) = self.spawn_commit() else {
            tracing::info!(topic = %self.topic.name, "Nothing to drain");
            return Ok(());
        };
        Self::await_within_drain(self.settings.drain_timeout, task).await
    }

    fn spawn_commit(&mut self) -> Option<JoinHandle<Result<(), PipelineError>>> {
        let (records, range) = self.batch.take()?;
        let committer = self.committer.clone();
        let watermark = self.tracker.current();
        Some(tokio::spawn(async move {
            committer.commit(records, range, watermark).await
        }))
    }

    async fn await_within_drain(
        drain_timeout: Duration,
        task: JoinHandle<Result<(), PipelineError>>,
    ) -> Result<(), PipelineError> {
        match tokio::time::timeout(drain_timeout, task).await {
            Ok(joined) => Self::joined(joined),
            Err(_) => Err(PipelineError::DrainTimeout(drain_timeout)),
        }
    }

    fn joined(
        joined: Result<Result<(), PipelineError>, JoinError>,
    ) -> Result<(), PipelineError> {
        joined.map_err(|e| PipelineError::Aborted(e.to_string()))?
    }
}
