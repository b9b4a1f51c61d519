//! Core types for the city-sync framework.
//!
//! This crate provides the foundational types shared by every pipeline:
//!
//! - [`FieldType`] - The closed set of field types a topic schema may use
//! - [`Schema`] / [`FieldDefinition`] - Ordered, name-unique record layouts
//! - [`TopicDescriptor`] - Everything a pipeline needs to know about one topic
//! - [`SchemaRegistry`] - Static topic name → schema lookup
//! - [`Record`] / [`RecordValue`] - Decoded, schema-typed records
//! - [`Position`] - Ordered source position shared by sources, sinks and checkpoints
//! - [`RetryPolicy`] - Bounded exponential backoff used by sources and sinks
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── json-types        (decodes JSON payloads into Records)
//!    ├─── file-sink         (maps Records onto Parquet columns)
//!    └─── pipeline          (watermarks, batching, supervision)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{SchemaRegistry, FieldType};
//!
//! let registry = SchemaRegistry::builtin();
//! let schema = registry.get_schema("gps_data").unwrap();
//! assert_eq!(
//!     schema.get_field("timestamp").map(|f| f.field_type),
//!     Some(FieldType::Timestamp)
//! );
//! assert!(registry.get_schema("unknown_topic").is_err());
//! ```

pub mod position;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use position::Position;
pub use registry::{BuiltinTopic, SchemaRegistry};
pub use retry::RetryPolicy;
pub use schema::{FieldDefinition, Schema, SchemaError, TopicDescriptor};
pub use types::FieldType;
pub use values::{Record, RecordValue};
