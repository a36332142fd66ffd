//! Statistics tracking for the forwarder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic per-outcome counters, shared by all query tasks.
pub struct Stats {
    started: Instant,
    requests: AtomicU64,
    forwarded: AtomicU64,
    cached: AtomicU64,
    blocked: AtomicU64,
    refused: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    /// Cumulative response time in microseconds for answered queries.
    total_response_time_us: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            refused: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
        }
    }

    fn record_answered(&self, counter: &AtomicU64, response_time_ms: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add((response_time_ms * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self, response_time_ms: f64) {
        self.record_answered(&self.forwarded, response_time_ms);
    }

    pub fn record_cached(&self, response_time_ms: f64) {
        self.record_answered(&self.cached, response_time_ms);
    }

    pub fn record_blocked(&self, response_time_ms: f64) {
        self.record_answered(&self.blocked, response_time_ms);
    }

    pub fn record_refused(&self, response_time_ms: f64) {
        self.record_answered(&self.refused, response_time_ms);
    }

    pub fn record_dropped(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let forwarded = self.forwarded.swap(0, Ordering::Relaxed);
        let cached = self.cached.swap(0, Ordering::Relaxed);
        let blocked = self.blocked.swap(0, Ordering::Relaxed);
        let refused = self.refused.swap(0, Ordering::Relaxed);
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        let failed = self.failed.swap(0, Ordering::Relaxed);
        let total_us = self.total_response_time_us.swap(0, Ordering::Relaxed);

        let answered = forwarded + cached + blocked + refused;
        let avg_response_ms = if answered > 0 {
            (total_us as f64 / answered as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            requests,
            forwarded,
            cached,
            blocked,
            refused,
            dropped,
            failed,
            avg_response_ms,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub forwarded: u64,
    pub cached: u64,
    pub blocked: u64,
    pub refused: u64,
    pub dropped: u64,
    pub failed: u64,
    pub avg_response_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_only_answered_queries() {
        let stats = Stats::new();
        stats.record_forwarded(3.0);
        stats.record_cached(1.0);
        stats.record_dropped();
        stats.record_failed();

        let snapshot = stats.snapshot_and_reset();

        assert_eq!(snapshot.requests, 4);
        assert_eq!(snapshot.forwarded, 1);
        assert_eq!(snapshot.cached, 1);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.failed, 1);
        assert!((snapshot.avg_response_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_resets_counters() {
        let stats = Stats::new();
        stats.record_blocked(0.5);
        stats.record_refused(0.5);
        stats.snapshot_and_reset();

        let snapshot = stats.snapshot_and_reset();

        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.avg_response_ms, 0.0);
    }
}
