//! city-sync
//!
//! Streams the smart-city event topics (vehicle, GPS, traffic camera,
//! weather and emergency events) from Kafka into columnar Parquet files,
//! one independent pipeline per topic.
//!
//! # Features
//!
//! - Schema-checked decoding: malformed payloads are counted and skipped
//! - Event-time watermarks: records older than the allowed lateness are dropped
//! - Size- and time-bounded batches, written to local disk or S3
//! - At-least-once delivery: checkpoints are committed after the sink confirms
//! - Graceful drain on SIGINT/SIGTERM with a bounded timeout
//!
//! # Crates
//!
//! - `sync_core` - schemas, records, positions and the schema registry
//! - `json_types` - JSON payload decoding
//! - `checkpoint` - checkpoint model and stores (filesystem, S3, memory)
//! - `city_sync_kafka_source` - the `SourceReader` trait and its Kafka reader
//! - `city_sync_file_sink` - the `SinkWriter` trait and its Parquet writer
//! - `city_sync_pipeline` - topic pipelines and their supervisor
//!
//! # CLI Usage
//!
//! ```bash
//! # Run every configured topic until interrupted
//! city-sync run --config city-sync.toml
//!
//! # Show the built-in topic schemas
//! city-sync schemas
//!
//! # Show where a topic will resume
//! city-sync checkpoint --config city-sync.toml --topic gps_data
//! ```

pub mod checkpoint;
pub mod config;
pub mod connect;
pub mod schema;
pub mod sync;

pub use config::AppConfig;
pub use connect::KafkaParquetFactory;
