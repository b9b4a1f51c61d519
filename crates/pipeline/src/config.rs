//! Pipeline settings.

use std::time::Duration;
use sync_core::RetryPolicy;

/// Default number of admitted records that closes a batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
/// Default age at which an open batch is closed
pub const DEFAULT_MAX_BATCH_DURATION: Duration = Duration::from_secs(10);
/// Default lateness window for event time
pub const DEFAULT_ALLOWED_LATENESS: Duration = Duration::from_secs(2 * 60);
/// Default event-time field
pub const DEFAULT_WATERMARK_FIELD: &str = "timestamp";

/// When a pipeline reports itself as degraded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeFailureThreshold {
    /// Failure ratio above which the pipeline is degraded
    pub ratio: f64,
    /// Number of most recent messages the ratio is computed over
    pub window: usize,
}

impl Default for DecodeFailureThreshold {
    fn default() -> Self {
        Self {
            ratio: 0.5,
            window: 100,
        }
    }
}

/// Settings shared by every pipeline of one supervisor.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Longest a single pull may block
    pub poll_timeout: Duration,
    /// Budget for the final flush after a stop request
    pub drain_timeout: Duration,
    /// Backoff for failing pulls
    pub source_retry: RetryPolicy,
    pub decode_failure_threshold: DecodeFailureThreshold,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(30),
            source_retry: RetryPolicy::default(),
            decode_failure_threshold: DecodeFailureThreshold::default(),
        }
    }
}

/// Configuration of one pipeline: one partition of one topic.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub name: String,
    /// Timestamp field carrying event time
    pub watermark_field: String,
    pub allowed_lateness: Duration,
    pub max_batch_size: usize,
    pub max_batch_duration: Duration,
    /// Overrides the default `<sink_root>/<topic>/` location
    pub sink_location: Option<String>,
    /// Source partition this pipeline consumes
    pub partition: i32,
}

impl TopicConfig {
    /// Topic with every setting at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            watermark_field: DEFAULT_WATERMARK_FIELD.to_string(),
            allowed_lateness: DEFAULT_ALLOWED_LATENESS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_batch_duration: DEFAULT_MAX_BATCH_DURATION,
            sink_location: None,
            partition: 0,
        }
    }

    /// Same topic settings for another partition.
    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = partition;
        self
    }

    /// `<topic>-<partition>`: names the pipeline and keys its checkpoint.
    pub fn pipeline_name(&self) -> String {
        checkpoint::checkpoint_key(&self.name, self.partition)
    }
}
