//! Global atomic counters for shelter analytics.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a CLI command finishes).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    readings_evaluated: AtomicU64,
    anomalies_flagged: AtomicU64,
    scoring_batches: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            readings_evaluated: AtomicU64::new(0),
            anomalies_flagged: AtomicU64::new(0),
            scoring_batches: AtomicU64::new(0),
        }
    }

    pub fn inc_readings_evaluated(&self) {
        self.readings_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "readings_evaluated", "counter incremented");
    }

    pub fn inc_anomalies(&self) {
        self.anomalies_flagged.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "anomalies_flagged", "counter incremented");
    }

    pub fn inc_scoring_batches(&self) {
        self.scoring_batches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "scoring_batches", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            readings_evaluated = self.readings_evaluated(),
            anomalies_flagged = self.anomalies_flagged(),
            scoring_batches = self.scoring_batches(),
        );
    }

    pub fn readings_evaluated(&self) -> u64 {
        self.readings_evaluated.load(Ordering::Relaxed)
    }

    pub fn anomalies_flagged(&self) -> u64 {
        self.anomalies_flagged.load(Ordering::Relaxed)
    }

    pub fn scoring_batches(&self) -> u64 {
        self.scoring_batches.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.readings_evaluated.store(0, Ordering::Relaxed);
        self.anomalies_flagged.store(0, Ordering::Relaxed);
        self.scoring_batches.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_readings_evaluated();
        m.inc_readings_evaluated();
        m.inc_anomalies();
        m.inc_scoring_batches();
        assert_eq!(m.readings_evaluated(), 2);
        assert_eq!(m.anomalies_flagged(), 1);
        assert_eq!(m.scoring_batches(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_readings_evaluated();
        m.inc_anomalies();
        m.inc_scoring_batches();
        m.reset();
        assert_eq!(m.readings_evaluated(), 0);
        assert_eq!(m.anomalies_flagged(), 0);
        assert_eq!(m.scoring_batches(), 0);
    }
}
