//! Event-time watermark tracking.
//!
//! The watermark trails the highest event time seen so far by the topic's
//! allowed lateness. A record is late when its event time is below the
//! watermark as it stood *before* that record was observed.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of observing one event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Dropped; `watermark` is the value the record was compared against
    Late { watermark: DateTime<Utc> },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Per-pipeline watermark state. Never shared between pipelines.
#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    allowed_lateness: chrono::Duration,
    current: Option<DateTime<Utc>>,
}

impl WatermarkTracker {
    /// Fresh tracker: no watermark yet, every record is admitted until one is seen.
    pub fn new(allowed_lateness: Duration) -> Self {
        Self::resume(allowed_lateness, None)
    }

    /// Tracker continuing from a checkpointed watermark.
    pub fn resume(allowed_lateness: Duration, watermark: Option<DateTime<Utc>>) -> Self {
        Self {
            allowed_lateness: chrono::Duration::from_std(allowed_lateness)
                .unwrap_or(chrono::Duration::MAX),
            current: watermark,
        }
    }

    /// Decide admission of `event_time`, then advance the watermark.
    pub fn observe(&mut self, event_time: DateTime<Utc>) -> Admission {
        let before = self.current;

        if let Some(candidate) = event_time.checked_sub_signed(self.allowed_lateness) {
            self.current = Some(match before {
                Some(watermark) => watermark.max(candidate),
                None => candidate,
            });
        }

        match before {
            Some(watermark) if event_time < watermark => Admission::Late { watermark },
            _ => Admission::Admitted,
        }
    }

    pub fn current(&self) -> Option<DateTime<Utc>> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_first_record_is_admitted() {
        let mut tracker = WatermarkTracker::new(Duration::from_secs(120));
        assert_eq!(tracker.current(), None);
        assert!(tracker.observe(at(10, 0)).is_admitted());
        assert_eq!(tracker.current(), Some(at(9, 58)));
    }

    #[test]
    fn test_two_minute_lateness_example() {
        // Newest event so far at 10:00 puts the watermark at 09:58.
        let mut tracker = WatermarkTracker::new(Duration::from_secs(120));
        tracker.observe(at(10, 0));

        assert_eq!(
            tracker.observe(at(9, 57)),
            Admission::Late {
                watermark: at(9, 58)
            }
        );
        assert_eq!(tracker.current(), Some(at(9, 58)));

        assert_eq!(tracker.observe(at(10, 1)), Admission::Admitted);
        assert_eq!(tracker.current(), Some(at(9, 59)));
    }

    #[test]
    fn test_record_at_watermark_is_admitted() {
        let mut tracker = WatermarkTracker::new(Duration::from_secs(120));
        tracker.observe(at(10, 0));
        assert!(tracker.observe(at(9, 58)).is_admitted());
    }

    #[test]
    fn test_late_check_uses_watermark_before_update() {
        // A big jump forward must not reject the record that caused it.
        let mut tracker = WatermarkTracker::new(Duration::ZERO);
        tracker.observe(at(10, 0));
        assert!(tracker.observe(at(12, 0)).is_admitted());
        assert!(!tracker.observe(at(11, 59)).is_admitted());
    }

    #[test]
    fn test_watermark_never_decreases() {
        let mut tracker = WatermarkTracker::new(Duration::from_secs(60));
        let mut previous = None;
        for (h, m) in [(10, 0), (9, 0), (10, 30), (10, 29), (8, 0), (11, 0), (10, 59)] {
            tracker.observe(at(h, m));
            assert!(tracker.current() >= previous);
            previous = tracker.current();
        }
        assert_eq!(tracker.current(), Some(at(10, 59)));
    }

    #[test]
    fn test_resume_from_checkpoint() {
        let mut tracker = WatermarkTracker::resume(Duration::from_secs(120), Some(at(9, 58)));
        assert!(!tracker.observe(at(9, 57)).is_admitted());
        assert!(tracker.observe(at(9, 59)).is_admitted());
        assert_eq!(tracker.current(), Some(at(9, 58)));
    }
}
