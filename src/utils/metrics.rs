//! Observability and Metrics
//!
//! Request and session counters for a gamestats service.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector shared by every request a service processes
#[derive(Debug)]
pub struct Metrics {
    /// Requests that reached the pipeline
    pub requests_total: AtomicU64,
    /// Main requests answered successfully
    pub requests_accepted: AtomicU64,
    /// Requests answered with a 4xx status
    pub requests_rejected: AtomicU64,
    /// Sessions issued
    pub sessions_created: AtomicU64,
    /// Payloads whose checksum did not match
    pub checksum_failures: AtomicU64,
    /// Handler invocations that returned an error
    pub handler_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_accepted: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            sessions_created: AtomicU64::new(0),
            checksum_failures: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn request_received(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            requests_total = snapshot.requests_total,
            requests_accepted = snapshot.requests_accepted,
            requests_rejected = snapshot.requests_rejected,
            sessions_created = snapshot.sessions_created,
            checksum_failures = snapshot.checksum_failures,
            handler_errors = snapshot.handler_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Gamestats metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_accepted: u64,
    pub requests_rejected: u64,
    pub sessions_created: u64,
    pub checksum_failures: u64,
    pub handler_errors: u64,
    pub uptime_seconds: u64,
}
