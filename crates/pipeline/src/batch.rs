//! The open batch of a pipeline.

use city_sync_file_sink::BatchPosition;
use std::time::Duration;
use sync_core::{Position, Record};
use tokio::time::Instant;

/// Records admitted since the last flush, plus the source range they came from.
///
/// Skipped messages (malformed or late) widen the range without adding a
/// record, so the checkpoint written after the flush moves past them too.
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<Record>,
    first: Option<Position>,
    last: Option<Position>,
    opened_at: Option<Instant>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record, position: Position) {
        self.track(position);
        self.records.push(record);
    }

    pub fn skip(&mut self, position: Position) {
        self.track(position);
    }

    fn track(&mut self, position: Position) {
        if self.first.is_none() {
            self.first = Some(position);
            self.opened_at = Some(Instant::now());
        }
        self.last = Some(position);
    }

    /// Whether no message has been added since the last flush.
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Close condition: enough records, or open for long enough.
    pub fn should_close(&self, max_size: usize, max_duration: Duration) -> bool {
        self.records.len() >= max_size
            || self
                .opened_at
                .is_some_and(|opened| opened.elapsed() >= max_duration)
    }

    /// Time left before the batch must close on duration; `None` while empty.
    pub fn remaining(&self, max_duration: Duration) -> Option<Duration> {
        self.opened_at
            .map(|opened| max_duration.saturating_sub(opened.elapsed()))
    }

    /// Close the batch, returning its records and range and resetting it.
    pub fn take(&mut self) -> Option<(Vec<Record>, BatchPosition)> {
        let batch = std::mem::take(self);
        match (batch.first, batch.last) {
            (Some(first), Some(last)) => Some((batch.records, BatchPosition::new(first, last))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::RecordValue;

    fn record(id: &str) -> Record {
        Record::new().field("id", RecordValue::String(id.to_string()))
    }

    #[test]
    fn test_range_covers_skipped_messages() {
        let mut batch = Batch::new();
        batch.skip(Position::new(0, 4));
        batch.push(record("a"), Position::new(0, 5));
        batch.skip(Position::new(0, 6));

        assert_eq!(batch.record_count(), 1);
        let (records, range) = batch.take().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            range,
            BatchPosition::new(Position::new(0, 4), Position::new(0, 6))
        );
        assert!(batch.is_empty());
        assert!(batch.take().is_none());
    }

    #[test]
    fn test_closes_on_size() {
        let mut batch = Batch::new();
        batch.push(record("a"), Position::new(0, 0));
        assert!(!batch.should_close(2, Duration::from_secs(60)));
        batch.push(record("b"), Position::new(0, 1));
        assert!(batch.should_close(2, Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_on_duration() {
        let mut batch = Batch::new();
        assert_eq!(batch.remaining(Duration::from_secs(5)), None);
        assert!(!batch.should_close(100, Duration::from_secs(5)));

        batch.skip(Position::new(0, 0));
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(
            batch.remaining(Duration::from_secs(5)),
            Some(Duration::from_secs(2))
        );
        assert!(!batch.should_close(100, Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(batch.should_close(100, Duration::from_secs(5)));
    }
}
