//! Atomic counters for an evolution run.
//!
//! The controller owns an `Arc<Metrics>` (injectable through
//! `EvolutionController::with_metrics`) and increments it silently at each
//! step. [`Metrics::flush`] emits current values as a single
//! `tracing::info!` event at the end of a run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free atomic counters.
#[derive(Debug)]
pub struct Metrics {
    candidates_generated: AtomicU64,
    evaluations: AtomicU64,
    compile_errors: AtomicU64,
    timeouts: AtomicU64,
    accepted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            candidates_generated: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
            compile_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    pub fn inc_candidates(&self) {
        self.candidates_generated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "candidates_generated", "counter incremented");
    }

    pub fn inc_evaluations(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations", "counter incremented");
    }

    pub fn inc_compile_errors(&self) {
        self.compile_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "compile_errors", "counter incremented");
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "timeouts", "counter incremented");
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "accepted", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            candidates_generated = self.candidates_generated(),
            evaluations = self.evaluations(),
            compile_errors = self.compile_errors(),
            timeouts = self.timeouts(),
            accepted = self.accepted(),
        );
    }

    pub fn candidates_generated(&self) -> u64 {
        self.candidates_generated.load(Ordering::Relaxed)
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn compile_errors(&self) -> u64 {
        self.compile_errors.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_candidates();
        m.inc_candidates();
        assert_eq!(m.candidates_generated(), 2);

        m.inc_evaluations();
        m.inc_timeouts();
        m.inc_compile_errors();
        m.inc_accepted();
        assert_eq!(m.evaluations(), 1);
        assert_eq!(m.timeouts(), 1);
        assert_eq!(m.compile_errors(), 1);
        assert_eq!(m.accepted(), 1);
    }
}
