//! JSON payload conversions for sync-core records.
//!
//! Every event category on the bus is published as one flat JSON object per
//! message. This crate turns those payloads into typed [`sync_core::Record`]s
//! and back.
//!
//! # Modules
//!
//! - [`reverse`] - JSON payload → Record (the record decoder)
//! - [`forward`] - Record → JSON payload
//!
//! # Example
//!
//! ```ignore
//! use json_types::{decode, encode};
//! use sync_core::SchemaRegistry;
//!
//! let schema = SchemaRegistry::builtin().get_schema("gps_data")?;
//! let record = decode(br#"{"id":"1","timestamp":"2024-01-01T10:00:00Z"}"#, &schema)?;
//! let payload = encode(&record);
//! ```

pub mod forward;
pub mod reverse;

pub use forward::{encode, JsonValue};
pub use reverse::{decode, DecodeError, DecodeFailure};
