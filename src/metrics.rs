// Performance metrics module
//
// Lightweight counters for the rename pipeline and scheduler

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Rename metrics
///
/// Uses atomic operations for thread-safe tracking without locks. The
/// pipeline, scheduler, and batch runner share one instance; `log_summary`
/// is called on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Documents actually renamed
    pub renames_completed: AtomicUsize,

    /// Pipeline runs where the name already matched
    pub renames_unchanged: AtomicUsize,

    /// Pipeline runs that hit a storage error
    pub renames_failed: AtomicUsize,

    /// Debounce timers cancelled by a newer request for the same document
    pub debounce_rearms: AtomicU64,

    /// Timers pushed out of the single debounce slot while still armed
    pub orphaned_timers: AtomicU64,

    /// "Rename all" sweeps run
    pub batches_run: AtomicU64,

    /// Time spent inside the pipeline in milliseconds
    pub total_rename_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            renames_completed: AtomicUsize::new(0),
            renames_unchanged: AtomicUsize::new(0),
            renames_failed: AtomicUsize::new(0),
            debounce_rearms: AtomicU64::new(0),
            orphaned_timers: AtomicU64::new(0),
            batches_run: AtomicU64::new(0),
            total_rename_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_rename_completed(&self) {
        self.renames_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rename_unchanged(&self) {
        self.renames_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rename_failed(&self) {
        self.renames_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_debounce_rearm(&self) {
        self.debounce_rearms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_orphaned_timer(&self) {
        self.orphaned_timers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time spent in one pipeline run
    pub fn record_rename_time(&self, duration: Duration) {
        self.total_rename_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Pipeline runs of any outcome
    pub fn pipeline_runs(&self) -> usize {
        self.renames_completed.load(Ordering::Relaxed)
            + self.renames_unchanged.load(Ordering::Relaxed)
            + self.renames_failed.load(Ordering::Relaxed)
    }

    /// Average time per pipeline run in milliseconds
    pub fn avg_rename_time_ms(&self) -> f64 {
        let total = self.total_rename_time_ms.load(Ordering::Relaxed);
        let count = self.pipeline_runs();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Rename Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Renames: {} completed, {} unchanged, {} failed",
            self.renames_completed.load(Ordering::Relaxed),
            self.renames_unchanged.load(Ordering::Relaxed),
            self.renames_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Pipeline time: {:.2}s (avg: {:.2}ms per run)",
            self.total_rename_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_rename_time_ms()
        );
        tracing::info!(
            "Debounce re-arms: {}, orphaned timers: {}, batches: {}",
            self.debounce_rearms.load(Ordering::Relaxed),
            self.orphaned_timers.load(Ordering::Relaxed),
            self.batches_run.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
