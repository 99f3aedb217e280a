//! Global atomic counters for benchmark observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the orchestrator does so at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations, no locking.
pub struct Metrics {
    rounds_completed: AtomicU64,
    rounds_recovered: AtomicU64,
    judges_dropped: AtomicU64,
    checkpoints_saved: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            rounds_completed: AtomicU64::new(0),
            rounds_recovered: AtomicU64::new(0),
            judges_dropped: AtomicU64::new(0),
            checkpoints_saved: AtomicU64::new(0),
        }
    }

    /// Increment the rounds-completed counter by one.
    pub fn inc_rounds_completed(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rounds_completed", "counter incremented");
    }

    /// Increment the rounds-recovered counter by one.
    pub fn inc_rounds_recovered(&self) {
        self.rounds_recovered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rounds_recovered", "counter incremented");
    }

    /// Add `n` dropped judges.
    pub fn add_judges_dropped(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.judges_dropped.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "judges_dropped", n, "counter incremented");
    }

    /// Increment the checkpoints-saved counter by one.
    pub fn inc_checkpoints_saved(&self) {
        self.checkpoints_saved.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checkpoints_saved", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            rounds_completed = self.rounds_completed(),
            rounds_recovered = self.rounds_recovered(),
            judges_dropped = self.judges_dropped(),
            checkpoints_saved = self.checkpoints_saved(),
        );
    }

    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed.load(Ordering::Relaxed)
    }

    pub fn rounds_recovered(&self) -> u64 {
        self.rounds_recovered.load(Ordering::Relaxed)
    }

    pub fn judges_dropped(&self) -> u64 {
        self.judges_dropped.load(Ordering::Relaxed)
    }

    pub fn checkpoints_saved(&self) -> u64 {
        self.checkpoints_saved.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.rounds_completed.store(0, Ordering::Relaxed);
        self.rounds_recovered.store(0, Ordering::Relaxed);
        self.judges_dropped.store(0, Ordering::Relaxed);
        self.checkpoints_saved.store(0, Ordering::Relaxed);
    }
}
