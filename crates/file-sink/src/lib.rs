//! Batch sink for city-sync: columnar files on the local filesystem or S3
//!
//! A pipeline hands every closed batch to a [`SinkWriter`]. The provided
//! [`ParquetSink`] encodes the batch as one Parquet file and stores it under
//! the topic's [`SinkLocation`].
//!
//! # Location Types
//!
//! - **Local**: a directory, e.g. `/data/city/gps_data/`
//! - **S3**: a bucket and key prefix, e.g. `s3://city-data/gps_data/`
//!
//! # Idempotence
//!
//! Files are named after the position range they cover
//! (`part-<partition>-<first>-<last>.parquet`). Replaying a batch after a
//! crash rewrites the same name instead of adding a second copy.
//!
//! # Example
//!
//! ```ignore
//! use city_sync_file_sink::{BatchPosition, ParquetSink, SinkLocation, SinkWriter};
//!
//! let location = SinkLocation::parse("s3://city-data/gps_data/")?;
//! let mut sink = ParquetSink::open("gps_data", schema, location, RetryPolicy::default()).await;
//! sink.write_batch(&records, BatchPosition::new(first, last)).await?;
//! ```

pub mod columnar;
mod error;
mod local;
mod location;
mod s3;
mod sink;
mod writer;

pub use error::SinkError;
pub use local::LocalFileWriter;
pub use location::SinkLocation;
pub use s3::S3Client;
pub use sink::ParquetSink;
pub use writer::{BatchPosition, SinkWriter};
