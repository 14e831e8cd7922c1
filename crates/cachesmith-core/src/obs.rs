//! Structured lifecycle events for an evolution run.
//!
//! This module provides:
//! - Iteration-scoped tracing spans via the `IterationSpan` RAII guard
//! - Emission functions for run start/finish, candidate generation,
//!   classification and acceptance
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).
//! For JSON output, pass `--json` to the CLI.

use tracing::{info, warn};

/// RAII guard that enters an iteration-scoped span for the duration of one
/// GENERATE → EVALUATE → decide cycle.
///
/// # Example
///
/// ```ignore
/// let _span = IterationSpan::enter(3);
/// // every event below carries iteration = 3
/// ```
pub struct IterationSpan {
    _span: tracing::span::EnteredSpan,
}

impl IterationSpan {
    pub fn enter(iteration: u32) -> Self {
        let span = tracing::info_span!("cachesmith.iteration", iteration = iteration);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: evolution loop started.
pub fn emit_evolution_started(iterations: u32, timeout_secs: u64, threshold: f64) {
    info!(
        event = "evolution.started",
        iterations = iterations,
        timeout_secs = timeout_secs,
        threshold = threshold,
    );
}

/// Emit event: an iteration began with `request`.
pub fn emit_iteration_started(iteration: u32, request: &str) {
    info!(
        event = "iteration.started",
        iteration = iteration,
        request = %request,
    );
}

/// Emit event: the oracle produced a candidate for `request`.
pub fn emit_candidate_generated(iteration: u32, candidate: &str, request: &str, bytes: usize) {
    info!(
        event = "candidate.generated",
        iteration = iteration,
        candidate = %candidate,
        request = %request,
        bytes = bytes,
    );
}

/// Emit event: an evaluation was classified.
pub fn emit_evaluation_classified(
    iteration: u32,
    candidate: &str,
    outcome: &str,
    score: Option<f64>,
    final_iteration: bool,
) {
    info!(
        event = "evaluation.classified",
        iteration = iteration,
        candidate = %candidate,
        outcome = %outcome,
        score = ?score,
        final_iteration = final_iteration,
    );
}

/// Emit event: a candidate met the threshold and was persisted.
pub fn emit_candidate_accepted(candidate: &str, score: f64, stored_at: &str) {
    info!(
        event = "candidate.accepted",
        candidate = %candidate,
        score = score,
        stored_at = %stored_at,
    );
}

/// Emit event: the iteration was abandoned without a further request.
pub fn emit_iteration_abandoned(iteration: u32, reason: &dyn std::fmt::Display) {
    warn!(event = "iteration.abandoned", iteration = iteration, reason = %reason);
}

/// Emit event: evolution loop finished.
pub fn emit_evolution_finished(iterations_run: u32, stop_reason: &str, best_score: Option<f64>) {
    info!(
        event = "evolution.finished",
        iterations_run = iterations_run,
        stop_reason = %stop_reason,
        best_score = ?best_score,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_span_create() {
        let _span = IterationSpan::enter(1);
        emit_candidate_generated(1, "cache_policy_1.cc", "initial", 42);
    }
}
