//! Source side of a city-sync topic pipeline.
//!
//! A pipeline reads raw messages through the [`SourceReader`] trait and never
//! talks to the bus client directly. [`KafkaSourceReader`] is the production
//! implementation; tests substitute in-memory readers.
//!
//! Features:
//!
//! - Manual partition assignment: one reader consumes exactly one partition
//! - Explicit positioning: the pipeline seeks to its checkpoint, or to the
//!   earliest retained offset when no checkpoint exists
//! - Bounded polls: `poll` never blocks longer than the caller's timeout

/// rdkafka-backed reader
pub mod consumer;
pub mod error;
/// The reader trait and the raw message it yields
pub mod reader;

pub use consumer::{KafkaSourceConfig, KafkaSourceReader};
pub use error::SourceError;
pub use reader::{RawMessage, SourceReader};
pub use sync_core::Position;
