//! Shared upload statistics
//!
//! One `UploadStats` is owned by the coordinator and shared by reference
//! with the collector and every worker. All counters are atomics; the
//! collector is the only writer of `total`.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Race-free counters for one upload run
#[derive(Debug)]
pub struct UploadStats {
    /// Files uploaded successfully
    uploaded: AtomicU64,

    /// Files that failed validation or transport
    failed: AtomicU64,

    /// Files dequeued after an interrupt and never attempted
    skipped: AtomicU64,

    /// Files discovered by the collector
    total: AtomicU64,

    /// Bytes uploaded successfully
    bytes_uploaded: AtomicU64,

    /// Set once the collector has finished discovering files
    total_final: AtomicBool,

    /// Monotonic start time
    started: Instant,

    /// Wall-clock start time (for display)
    started_at: DateTime<Local>,
}

impl UploadStats {
    /// Create zeroed statistics, starting the clock now
    pub fn new() -> Self {
        Self {
            uploaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            total: AtomicU64::new(0),
            bytes_uploaded: AtomicU64::new(0),
            total_final: AtomicBool::new(false),
            started: Instant::now(),
            started_at: Local::now(),
        }
    }

    // Counters use SeqCst so that a snapshot which loads the completion
    // counters before `total` never observes `uploaded + failed > total`.

    /// Record a newly discovered file (collector only)
    pub fn record_discovered(&self) -> u64 {
        self.total.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mark `total` as final (collector only)
    pub fn finalize_total(&self) {
        self.total_final.store(true, Ordering::SeqCst);
    }

    /// Record a successful upload
    pub fn record_success(&self, bytes: u64) {
        self.bytes_uploaded.fetch_add(bytes, Ordering::SeqCst);
        self.uploaded.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a failed upload
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a job dropped because of an interrupt
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    /// Wall-clock time the run started
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Take a snapshot for display
    ///
    /// Counts never decrease between snapshots, but a snapshot is not
    /// linearizable with individual increments.
    pub fn snapshot(&self) -> StatsSnapshot {
        let uploaded = self.uploaded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let skipped = self.skipped.load(Ordering::SeqCst);
        let bytes_uploaded = self.bytes_uploaded.load(Ordering::SeqCst);
        let total_final = self.total_final.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);

        StatsSnapshot {
            uploaded,
            failed,
            skipped,
            total,
            total_final,
            bytes_uploaded,
            elapsed: self.elapsed(),
        }
    }
}

impl Default for UploadStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of `UploadStats`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub uploaded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
    pub total_final: bool,
    pub bytes_uploaded: u64,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Files that have finished, successfully or not
    pub fn completed(&self) -> u64 {
        self.uploaded + self.failed
    }

    /// Percentage complete, once the total is known
    pub fn percent(&self) -> Option<f64> {
        if !self.total_final {
            return None;
        }
        if self.total == 0 {
            return Some(100.0);
        }
        Some(self.completed() as f64 * 100.0 / self.total as f64)
    }

    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed() as f64 / secs
        } else {
            0.0
        }
    }

    /// Calculate upload throughput in bytes per second
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_uploaded as f64 / secs
        } else {
            0.0
        }
    }
}
