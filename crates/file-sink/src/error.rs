use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    /// The batch cannot be turned into a columnar file. Retrying will not help.
    #[error("Failed to encode batch: {0}")]
    Encode(String),

    #[error("I/O error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Object storage error at {location}: {message}")]
    Storage { location: String, message: String },

    #[error("Invalid sink location '{0}'")]
    InvalidLocation(String),

    /// The sink gave up after its own retry budget
    #[error("Write to {location} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        location: String,
        attempts: u32,
        last_error: String,
    },
}

impl SinkError {
    /// Whether the same write may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Io { .. } | SinkError::Storage { .. })
    }
}

impl From<arrow::error::ArrowError> for SinkError {
    fn from(e: arrow::error::ArrowError) -> Self {
        SinkError::Encode(e.to_string())
    }
}

impl From<parquet::errors::ParquetError> for SinkError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        SinkError::Encode(e.to_string())
    }
}
