use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use sync_core::Position;

/// One undecoded message as delivered by the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// Message value; empty for tombstones
    pub payload: Vec<u8>,
    /// Where the message sits in the source
    pub position: Position,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Broker timestamp (milliseconds since epoch)
    pub timestamp_ms: Option<i64>,
}

impl RawMessage {
    pub fn new(payload: impl Into<Vec<u8>>, position: Position) -> Self {
        Self {
            payload: payload.into(),
            position,
            key: None,
            timestamp_ms: None,
        }
    }
}

/// Per-topic reader a pipeline pulls from.
///
/// Messages are delivered in position order. After `seek(p)` the next message
/// returned by `poll` is the first one at or after `p`.
#[async_trait]
pub trait SourceReader: Send {
    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means nothing arrived in time; it is not an error.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawMessage>>;

    /// Resume reading at `position`.
    async fn seek(&mut self, position: Position) -> Result<()>;

    /// Oldest position still retained by the source.
    async fn earliest_position(&mut self) -> Result<Position>;
}

#[async_trait]
impl<R: SourceReader + ?Sized> SourceReader for Box<R> {
    async fn poll(&mut self, timeout: Duration) -> Result<Option<RawMessage>> {
        (**self).poll(timeout).await
    }

    async fn seek(&mut self, position: Position) -> Result<()> {
        (**self).seek(position).await
    }

    async fn earliest_position(&mut self) -> Result<Position> {
        (**self).earliest_position().await
    }
}
