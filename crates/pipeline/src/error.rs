use checkpoint::CheckpointError;
use city_sync_file_sink::SinkError;
use city_sync_kafka_source::SourceError;
use std::time::Duration;
use sync_core::SchemaError;
use thiserror::Error;

/// Why a pipeline ended in `FAILED`.
///
/// Per-message problems (malformed payloads, late records) are counted in
/// metrics and never show up here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Topic has no registered schema; the pipeline never started
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Topic settings do not fit its schema (e.g. bad watermark field)
    #[error("Invalid topic configuration: {0}")]
    InvalidTopic(#[source] SchemaError),

    /// Source could not be opened, or a pull kept failing after retries
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Sink gave up on a batch
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Stored checkpoint is unreadable; requires operator action
    #[error("Corrupt checkpoint: {0}")]
    CheckpointCorrupt(#[source] CheckpointError),

    /// Checkpoint store failed while loading or committing
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[source] CheckpointError),

    /// Final flush did not finish in time
    #[error("Drain did not complete within {0:?}")]
    DrainTimeout(Duration),

    /// The pipeline task panicked or was cancelled
    #[error("Pipeline task aborted: {0}")]
    Aborted(String),
}

impl From<CheckpointError> for PipelineError {
    fn from(e: CheckpointError) -> Self {
        if e.is_corrupt() {
            PipelineError::CheckpointCorrupt(e)
        } else {
            PipelineError::Checkpoint(e)
        }
    }
}

impl From<SchemaError> for PipelineError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownTopic(topic) => PipelineError::UnknownTopic(topic),
            other => PipelineError::InvalidTopic(other),
        }
    }
}
