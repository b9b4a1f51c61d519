//! Source positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, totally ordered source position.
///
/// A pipeline consumes a single partition, so positions of one pipeline only
/// ever differ in `offset`. Ordering compares the partition first to stay
/// total across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub partition: i32,
    pub offset: i64,
}

impl Position {
    pub fn new(partition: i32, offset: i64) -> Self {
        Self { partition, offset }
    }

    /// The position immediately after this one.
    pub fn next(&self) -> Self {
        Self {
            partition: self.partition,
            offset: self.offset + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}
