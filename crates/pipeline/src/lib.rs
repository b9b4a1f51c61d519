//! Per-topic streaming pipelines for city-sync.
//!
//! Each partition of a topic gets its own [`TopicPipeline`], named
//! `<topic>-<partition>`: it pulls raw messages from a
//! [`SourceReader`](city_sync_kafka_source::SourceReader), decodes them
//! against the topic schema, drops records behind the event-time watermark,
//! batches the rest and hands closed batches to a
//! [`SinkWriter`](city_sync_file_sink::SinkWriter). A checkpoint is only
//! committed after the sink has confirmed the batch, so delivery is
//! at-least-once.
//!
//! The [`Supervisor`] starts one pipeline per configured partition, relays the
//! shutdown request and collects a [`ShutdownReport`] once every pipeline
//! has reached `STOPPED` or `FAILED`.
//!
//! ```text
//! STARTING ──► RUNNING ──► DRAINING ──► STOPPED
//!     │           │            │
//!     └───────────┴────────────┴──────► FAILED
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod handle;
pub mod health;
pub mod metrics;
mod pipeline;
pub mod supervisor;
pub mod watermark;

pub use config::{DecodeFailureThreshold, PipelineSettings, TopicConfig};
pub use error::PipelineError;
pub use handle::{PipelineControl, PipelineHandle, PipelineOutcome, PipelineState};
pub use health::Health;
pub use metrics::MetricsSnapshot;
pub use pipeline::TopicPipeline;
pub use supervisor::{ConnectorFactory, ShutdownReport, Supervisor};
pub use watermark::{Admission, WatermarkTracker};
