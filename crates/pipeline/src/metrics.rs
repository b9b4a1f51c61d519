//! Per-pipeline counters.

use crate::health::Health;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use sync_core::Position;

/// Counters written by one pipeline and read through its handle.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    messages_consumed: AtomicU64,
    records_written: AtomicU64,
    decode_failures: AtomicU64,
    late_drops: AtomicU64,
    batches_flushed: AtomicU64,
    degraded: AtomicBool,
    last_checkpoint: Mutex<Option<Position>>,
    watermark: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`PipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_consumed: u64,
    pub records_written: u64,
    pub decode_failures: u64,
    pub late_drops: u64,
    pub batches_flushed: u64,
    pub last_checkpoint: Option<Position>,
    pub watermark: Option<DateTime<Utc>>,
    pub health: Health,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_consumed(&self) {
        self.messages_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_late_drops(&self) {
        self.late_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, records: usize) {
        self.records_written
            .fetch_add(records as u64, Ordering::Relaxed);
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_checkpoint(&self, position: Position) {
        *lock(&self.last_checkpoint) = Some(position);
    }

    pub fn set_watermark(&self, watermark: Option<DateTime<Utc>>) {
        *lock(&self.watermark) = watermark;
    }

    pub fn set_health(&self, health: Health) {
        self.degraded
            .store(health == Health::Degraded, Ordering::Relaxed);
    }

    pub fn health(&self) -> Health {
        if self.degraded.load(Ordering::Relaxed) {
            Health::Degraded
        } else {
            Health::Healthy
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_consumed: self.messages_consumed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            late_drops: self.late_drops.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            last_checkpoint: *lock(&self.last_checkpoint),
            watermark: *lock(&self.watermark),
            health: self.health(),
        }
    }
}
