//! Decode-failure health signal.

use serde::Serialize;
use std::collections::VecDeque;

/// Reported health of a pipeline. Informational only; never stops a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    #[default]
    Healthy,
    Degraded,
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Health::Healthy => write!(f, "healthy"),
            Health::Degraded => write!(f, "degraded"),
        }
    }
}

/// Decode failure ratio over the last `window` messages.
///
/// The ratio is only judged once the window has filled up.
#[derive(Debug)]
pub struct DecodeHealth {
    outcomes: VecDeque<bool>,
    window: usize,
    failures: usize,
    threshold: f64,
    state: Health,
}

impl DecodeHealth {
    pub fn new(threshold: f64, window: usize) -> Self {
        let window = window.max(1);
        Self {
            outcomes: VecDeque::with_capacity(window),
            window,
            failures: 0,
            threshold,
            state: Health::Healthy,
        }
    }

    /// Record one decode attempt. Returns the new health when it changes.
    pub fn record(&mut self, failed: bool) -> Option<Health> {
        if self.outcomes.len() == self.window && self.outcomes.pop_front() == Some(true) {
            self.failures -= 1;
        }
        self.outcomes.push_back(failed);
        if failed {
            self.failures += 1;
        }

        if self.outcomes.len() < self.window {
            return None;
        }

        let next = if self.ratio() > self.threshold {
            Health::Degraded
        } else {
            Health::Healthy
        };
        if next != self.state {
            self.state = next;
            return Some(next);
        }
        None
    }

    pub fn ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.failures as f64 / self.outcomes.len() as f64
        }
    }

    pub fn state(&self) -> Health {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrades_and_recovers() {
        let mut health = DecodeHealth::new(0.5, 4);

        assert_eq!(health.record(true), None);
        assert_eq!(health.record(true), None);
        assert_eq!(health.record(true), None);
        // Window full: 4/4 failed
        assert_eq!(health.record(true), Some(Health::Degraded));
        assert_eq!(health.record(false), None); // 3/4

        assert_eq!(health.record(false), Some(Health::Healthy)); // 2/4, not above 0.5
        assert_eq!(health.state(), Health::Healthy);
        assert!((health.ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_window_is_clamped() {
        let mut health = DecodeHealth::new(0.0, 0);
        assert_eq!(health.record(true), Some(Health::Degraded));
    }
}
