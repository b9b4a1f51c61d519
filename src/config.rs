//! TOML configuration for `city-sync run`.
//!
//! ```toml
//! bus_endpoint = "localhost:9092"
//! checkpoint_location = "/var/lib/city-sync/checkpoints"
//! sink_root = "s3://city-data/raw/"
//! drain_timeout = "30s"
//!
//! [source_retry]
//! max_retries = 5
//! base_delay = "100ms"
//!
//! [[topics]]
//! name = "gps_data"
//! partitions = [0, 1, 2]
//! allowed_lateness = "2m"
//! max_batch_size = 500
//! ```
//!
//! Every listed partition gets its own pipeline and checkpoint. Without
//! `[[topics]]` every built-in topic is run on partition 0 with default
//! settings.

pub mod duration;

use anyhow::Context;
use checkpoint::CheckpointStorage;
use city_sync_file_sink::SinkLocation;
use city_sync_pipeline::config::{
    DEFAULT_ALLOWED_LATENESS, DEFAULT_MAX_BATCH_DURATION, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_WATERMARK_FIELD,
};
use city_sync_pipeline::{DecodeFailureThreshold, PipelineSettings, TopicConfig};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use sync_core::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS};
use sync_core::{BuiltinTopic, RetryPolicy, Schema, SchemaRegistry};

/// Contents of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Kafka bootstrap servers
    #[serde(default = "default_bus_endpoint")]
    pub bus_endpoint: String,

    #[serde(default = "default_group_id")]
    pub group_id: String,

    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Local directory or `s3://bucket/prefix/`
    pub checkpoint_location: String,

    /// Parent location of every topic's default sink location
    pub sink_root: String,

    #[serde(
        default = "default_drain_timeout",
        deserialize_with = "duration::deserialize"
    )]
    pub drain_timeout: Duration,

    #[serde(
        default = "default_poll_timeout",
        deserialize_with = "duration::deserialize"
    )]
    pub poll_timeout: Duration,

    /// Backoff for failing pulls
    #[serde(default)]
    pub source_retry: RetryConfig,

    /// Backoff for failing batch writes
    #[serde(default)]
    pub sink_retry: RetryConfig,

    #[serde(default)]
    pub decode_failure_threshold: ThresholdConfig,

    #[serde(default)]
    pub topics: Vec<TopicEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(
        default = "default_base_delay",
        deserialize_with = "duration::deserialize"
    )]
    pub base_delay: Duration,
}

impl RetryConfig {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.base_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    #[serde(default = "default_ratio")]
    pub ratio: f64,

    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            ratio: default_ratio(),
            window: default_window(),
        }
    }
}

/// One `[[topics]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicEntry {
    pub name: String,

    /// Replaces the built-in schema of the topic
    #[serde(default)]
    pub schema: Option<Schema>,

    #[serde(default = "default_watermark_field")]
    pub watermark_field: String,

    #[serde(
        default = "default_allowed_lateness",
        deserialize_with = "duration::deserialize"
    )]
    pub allowed_lateness: Duration,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(
        default = "default_max_batch_duration",
        deserialize_with = "duration::deserialize"
    )]
    pub max_batch_duration: Duration,

    #[serde(default)]
    pub sink_location: Option<String>,

    /// Partitions to consume, one pipeline each
    #[serde(default = "default_partitions")]
    pub partitions: Vec<i32>,
}

fn default_partitions() -> Vec<i32> {
    vec![0]
}

fn default_bus_endpoint() -> String {
    "localhost:9092".to_string()
}

fn default_group_id() -> String {
    "city-sync".to_string()
}

fn default_session_timeout_ms() -> u64 {
    6000
}

fn default_drain_timeout() -> Duration {
    PipelineSettings::default().drain_timeout
}

fn default_poll_timeout() -> Duration {
    PipelineSettings::default().poll_timeout
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay() -> Duration {
    Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS)
}

fn default_ratio() -> f64 {
    DecodeFailureThreshold::default().ratio
}

fn default_window() -> usize {
    DecodeFailureThreshold::default().window
}

fn default_watermark_field() -> String {
    DEFAULT_WATERMARK_FIELD.to_string()
}

fn default_allowed_lateness() -> Duration {
    DEFAULT_ALLOWED_LATENESS
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_max_batch_duration() -> Duration {
    DEFAULT_MAX_BATCH_DURATION
}

impl AppConfig {
    /// Read and validate a configuration file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let threshold = &self.decode_failure_threshold;
        if !(0.0..=1.0).contains(&threshold.ratio) {
            anyhow::bail!(
                "decode_failure_threshold.ratio must be between 0 and 1, got {}",
                threshold.ratio
            );
        }
        if threshold.window == 0 {
            anyhow::bail!("decode_failure_threshold.window must be positive");
        }

        self.checkpoint_storage()?;
        self.sink_root_location()?;

        let mut seen = HashSet::new();
        let mut overridden = HashSet::new();
        for topic in &self.topics {
            if topic.partitions.is_empty() {
                anyhow::bail!("Topic '{}': partitions must not be empty", topic.name);
            }
            for &partition in &topic.partitions {
                if partition < 0 {
                    anyhow::bail!("Topic '{}': invalid partition {partition}", topic.name);
                }
                if !seen.insert((topic.name.as_str(), partition)) {
                    anyhow::bail!(
                        "Partition {partition} of topic '{}' is configured more than once",
                        topic.name
                    );
                }
            }
            if topic.schema.is_some() && !overridden.insert(topic.name.as_str()) {
                anyhow::bail!("Topic '{}': schema is overridden more than once", topic.name);
            }
            if topic.max_batch_size == 0 {
                anyhow::bail!("Topic '{}': max_batch_size must be positive", topic.name);
            }
            if topic.max_batch_duration.is_zero() {
                anyhow::bail!("Topic '{}': max_batch_duration must be positive", topic.name);
            }
            if let Some(location) = &topic.sink_location {
                SinkLocation::parse(location)
                    .with_context(|| format!("Topic '{}': invalid sink_location", topic.name))?;
            }
        }
        Ok(())
    }

    pub fn checkpoint_storage(&self) -> anyhow::Result<CheckpointStorage> {
        CheckpointStorage::parse(&self.checkpoint_location)
            .context("Invalid checkpoint_location")
    }

    pub fn sink_root_location(&self) -> anyhow::Result<SinkLocation> {
        SinkLocation::parse(&self.sink_root).context("Invalid sink_root")
    }

    pub fn source_retry_policy(&self) -> RetryPolicy {
        self.source_retry.policy()
    }

    pub fn sink_retry_policy(&self) -> RetryPolicy {
        self.sink_retry.policy()
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            poll_timeout: self.poll_timeout,
            drain_timeout: self.drain_timeout,
            source_retry: self.source_retry_policy(),
            decode_failure_threshold: DecodeFailureThreshold {
                ratio: self.decode_failure_threshold.ratio,
                window: self.decode_failure_threshold.window,
            },
        }
    }

    /// Built-in schemas with the configured overrides applied.
    ///
    /// Topics without a built-in schema are left out here; their pipelines
    /// fail on their own with an unknown-topic error.
    pub fn schema_registry(&self) -> anyhow::Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::builtin();
        for topic in &self.topics {
            if let Some(schema) = &topic.schema {
                registry = registry
                    .with_override(&topic.name, schema.clone())
                    .with_context(|| format!("Cannot override schema of '{}'", topic.name))?;
            }
        }
        Ok(registry)
    }

    /// One entry per pipeline to run: every configured partition, or
    /// partition 0 of every built-in topic when no topics are configured.
    pub fn topic_configs(&self) -> Vec<TopicConfig> {
        if self.topics.is_empty() {
            return BuiltinTopic::ALL
                .iter()
                .map(|t| TopicConfig::new(t.name()))
                .collect();
        }

        self.topics
            .iter()
            .flat_map(|t| {
                t.partitions.iter().map(move |&partition| TopicConfig {
                    name: t.name.clone(),
                    watermark_field: t.watermark_field.clone(),
                    allowed_lateness: t.allowed_lateness,
                    max_batch_size: t.max_batch_size,
                    max_batch_duration: t.max_batch_duration,
                    sink_location: t.sink_location.clone(),
                    partition,
                })
            })
            .collect()
    }
}
