use crate::error::SinkError;
use async_trait::async_trait;
use std::fmt;
use sync_core::{Position, Record};

/// Source position range covered by one batch, both ends inclusive.
///
/// The range includes messages that were skipped (malformed or late), so it
/// can be wider than the records actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchPosition {
    pub first: Position,
    pub last: Position,
}

impl BatchPosition {
    pub fn new(first: Position, last: Position) -> Self {
        Self { first, last }
    }

    /// Deterministic file name for this range.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "part-{}-{}-{}.{extension}",
            self.first.partition, self.first.offset, self.last.offset
        )
    }
}

impl fmt::Display for BatchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

/// Per-topic destination of closed batches.
///
/// `write_batch` returns only once the batch is durable, or with the error
/// that made the sink give up. Writing an overlapping batch again after a
/// crash must be tolerated.
#[async_trait]
pub trait SinkWriter: Send + Sync {
    async fn write_batch(
        &mut self,
        records: &[Record],
        position: BatchPosition,
    ) -> Result<(), SinkError>;
}

#[async_trait]
impl<W: SinkWriter + ?Sized> SinkWriter for Box<W> {
    async fn write_batch(
        &mut self,
        records: &[Record],
        position: BatchPosition,
    ) -> Result<(), SinkError> {
        (**self).write_batch(records, position).await
    }
}
