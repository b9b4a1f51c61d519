//! Checkpoint management for city-sync
//!
//! Every pipeline consumes one partition of one topic and owns exactly one
//! checkpoint, keyed `<topic>-<partition>`: the position of the last message
//! covered by a durably written batch, and the watermark at that point. It is
//! read once when the pipeline starts and overwritten after each successful
//! flush.
//!
//! # Architecture
//!
//! - [`TopicCheckpoint`] is the persisted record
//! - [`CheckpointStore`] abstracts where it is persisted
//! - [`CheckpointStorage`] selects a backend from a configured location
//!
//! ## Storage Backends
//!
//! - `FilesystemStore` - `<dir>/<topic>-<partition>.json`, replaced atomically via rename
//! - `S3Store` - `s3://<bucket>/<prefix><topic>-<partition>.json`, one PUT per save
//! - `MemoryStore` - in-process map, used by tests and dry runs
//!
//! # File Format
//!
//! ```json
//! {
//!     "topic_name": "gps_data",
//!     "last_acked_position": { "partition": 0, "offset": 1041 },
//!     "watermark_value": "2024-01-01T09:58:00Z",
//!     "updated_at": "2024-01-01T10:00:03.120Z"
//! }
//! ```

mod config;
mod filesystem;
mod memory;
mod s3;
pub mod store;


pub use config::CheckpointStorage;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use s3::S3Store;
pub use store::{CheckpointError, CheckpointStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sync_core::Position;

/// Durable resume state of one partition of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCheckpoint {
    /// Topic this checkpoint belongs to
    pub topic_name: String,
    /// Position of the last message included in a durably written batch
    pub last_acked_position: Position,
    /// Watermark at the time of the commit; `None` before any event was admitted
    pub watermark_value: Option<DateTime<Utc>>,
    /// Wall-clock time of the commit
    pub updated_at: DateTime<Utc>,
}

impl TopicCheckpoint {
    pub fn new(
        topic_name: impl Into<String>,
        last_acked_position: Position,
        watermark_value: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            topic_name: topic_name.into(),
            last_acked_position,
            watermark_value,
            updated_at: Utc::now(),
        }
    }

    /// Store key: `<topic>-<partition>` of the acknowledged position.
    pub fn key(&self) -> String {
        checkpoint_key(&self.topic_name, self.last_acked_position.partition)
    }

    /// Position the source should resume from.
    pub fn resume_position(&self) -> Position {
        self.last_acked_position.next()
    }

    /// Human-readable one-liner used in logs and by the CLI.
    pub fn to_cli_string(&self) -> String {
        let watermark = self
            .watermark_value
            .map(|w| w.to_rfc3339())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "{} position={} watermark={}",
            self.topic_name, self.last_acked_position, watermark
        )
    }

    /// Serialize to the stored JSON form.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec_pretty(self).map_err(|e| CheckpointError::Corrupt {
            topic: self.key(),
            reason: e.to_string(),
        })
    }

    /// Parse the stored JSON form, checking it belongs to `key`.
    pub(crate) fn from_bytes(key: &str, bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: TopicCheckpoint =
            serde_json::from_slice(bytes).map_err(|e| CheckpointError::Corrupt {
                topic: key.to_string(),
                reason: e.to_string(),
            })?;

        if checkpoint.key() != key {
            return Err(CheckpointError::Corrupt {
                topic: key.to_string(),
                reason: format!("checkpoint belongs to '{}'", checkpoint.key()),
            });
        }

        Ok(checkpoint)
    }
}

/// Key of the checkpoint of one partition of a topic.
pub fn checkpoint_key(topic: &str, partition: i32) -> String {
    format!("{topic}-{partition}")
}

/// File name of a checkpoint inside a checkpoint location.
pub fn checkpoint_file_name(key: &str) -> String {
    format!("{key}.json")
}
