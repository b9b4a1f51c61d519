use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Pull failure expected to clear on retry
    #[error("Transient source error: {0}")]
    Transient(String),

    /// Failure no retry can fix (bad configuration, unknown partition)
    #[error("Fatal source error: {0}")]
    Fatal(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    /// Whether a pull that failed with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Transient(_) => true,
            SourceError::Kafka(e) => !matches!(
                e.rdkafka_error_code(),
                Some(
                    rdkafka::types::RDKafkaErrorCode::UnknownTopicOrPartition
                        | rdkafka::types::RDKafkaErrorCode::TopicAuthorizationFailed
                        | rdkafka::types::RDKafkaErrorCode::GroupAuthorizationFailed
                )
            ),
            SourceError::Fatal(_) | SourceError::InvalidConfig(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(SourceError::Transient("broker down".into()).is_retryable());
        assert!(!SourceError::Fatal("bad partition".into()).is_retryable());
        assert!(!SourceError::InvalidConfig("empty topic".into()).is_retryable());
        assert!(SourceError::Kafka(rdkafka::error::KafkaError::NoMessageReceived).is_retryable());
    }
}
