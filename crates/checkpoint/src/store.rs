//! Checkpoint storage trait and errors.

use async_trait::async_trait;

use crate::TopicCheckpoint;

/// Error type for checkpoint storage.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Stored data exists but cannot be used. Never repaired automatically.
    #[error("Checkpoint '{topic}' is corrupt: {reason}")]
    Corrupt { topic: String, reason: String },

    #[error("Checkpoint I/O error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote backend failure (S3)
    #[error("Checkpoint storage error at {location}: {message}")]
    Storage { location: String, message: String },

    #[error("Invalid checkpoint location '{0}'")]
    InvalidLocation(String),
}

impl CheckpointError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, CheckpointError::Corrupt { .. })
    }
}

/// Trait for checkpoint storage operations.
///
/// Implementations must make `save` atomic: a concurrent or subsequent `load`
/// sees either the previous checkpoint or the new one, never a mix.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the checkpoint stored under `key` (`<topic>-<partition>`).
    ///
    /// Returns `None` if nothing has been checkpointed under that key yet.
    async fn load(&self, key: &str) -> Result<Option<TopicCheckpoint>, CheckpointError>;

    /// Replace the checkpoint stored under `checkpoint.key()`.
    async fn save(&self, checkpoint: &TopicCheckpoint) -> Result<(), CheckpointError>;

    /// Where the checkpoint under `key` lives, for logs.
    fn describe(&self, key: &str) -> String;
}
