//! Per-stream counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single batching stream
#[derive(Debug, Default)]
pub struct StreamMetrics {
    /// Records currently buffered
    buffered: AtomicUsize,
    /// Records accepted into a buffer
    accepted_count: AtomicU64,
    /// Records dropped for exceeding the per-record ceiling
    oversized_count: AtomicU64,
    /// Lines rejected because the payload could not be parsed
    malformed_count: AtomicU64,
    /// Batches handed to the sink
    batch_count: AtomicU64,
    /// Records the sink acknowledged
    delivered_count: AtomicU64,
    /// Records dropped after exhausting retries or a failed batch call
    abandoned_count: AtomicU64,
    /// Resubmissions of failed subsets
    retry_count: AtomicU64,
    /// Batch calls that failed as a whole
    transport_failure_count: AtomicU64,
}

impl StreamMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buffered(&self, len: usize) {
        self.buffered.store(len, Ordering::Relaxed);
    }

    pub fn inc_accepted(&self) {
        self.accepted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_oversized(&self) {
        self.oversized_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.malformed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches(&self) {
        self.batch_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_delivered(&self, count: usize) {
        self.delivered_count
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn add_abandoned(&self, count: usize) {
        self.abandoned_count
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_transport_failures(&self) {
        self.transport_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffered: self.buffered.load(Ordering::Relaxed),
            accepted: self.accepted_count.load(Ordering::Relaxed),
            oversized: self.oversized_count.load(Ordering::Relaxed),
            malformed: self.malformed_count.load(Ordering::Relaxed),
            batches: self.batch_count.load(Ordering::Relaxed),
            delivered: self.delivered_count.load(Ordering::Relaxed),
            abandoned: self.abandoned_count.load(Ordering::Relaxed),
            retries: self.retry_count.load(Ordering::Relaxed),
            transport_failures: self.transport_failure_count.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of stream metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffered: usize,
    pub accepted: u64,
    pub oversized: u64,
    pub malformed: u64,
    pub batches: u64,
    pub delivered: u64,
    pub abandoned: u64,
    pub retries: u64,
    pub transport_failures: u64,
}
