//! Per-worker counters, shared between the worker thread and its handle

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single persistence worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Queue depth seen at the last read
    queue_len: AtomicUsize,
    committed: AtomicU64,
    failed: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn inc_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            committed: self.committed(),
            failed: self.failed(),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub committed: u64,
    pub failed: u64,
}
