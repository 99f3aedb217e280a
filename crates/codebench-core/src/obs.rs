//! Structured observability hooks for benchmark run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `RunSpan` RAII guard
//! - Emission functions for run, round, judge and checkpoint events
//!
//! Events are emitted at `info!` level, or `warn!` for degraded paths.
//! Every event carries an `event = "..."` field for filtering.

use tracing::{info, warn};

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// Only hold it across synchronous sections. Async tasks should be
/// instrumented with [`RunSpan::span`] instead.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("2d4c...");
/// // tracing calls here carry run_id = "2d4c..."
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: Self::span(run_id).entered(),
        }
    }

    /// The un-entered span, for `Instrument::instrument`.
    pub fn span(run_id: &str) -> tracing::Span {
        tracing::info_span!("codebench.run", run_id = %run_id)
    }
}

/// Emit event: run started.
///
/// ```ignore
/// emit_run_started("run-1", "openai/gpt-4o", 10, 2);
/// // logs: event=run.started run_id=run-1 target_model=openai/gpt-4o total_rounds=10 judges=2
/// ```
pub fn emit_run_started(run_id: &str, target_model: &str, total_rounds: usize, judges: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        target_model = %target_model,
        total_rounds = total_rounds,
        judges = judges,
    );
}

/// Emit event: run finished with duration, aggregate score and failure count.
pub fn emit_run_finished(
    run_id: &str,
    duration_ms: u64,
    overall_score: f64,
    failed_rounds: usize,
    success: bool,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        overall_score = overall_score,
        failed_rounds = failed_rounds,
        success = success,
    );
}

/// Emit event: a round completed scoring.
pub fn emit_round_finished(round_index: usize, overall_score: f64, ija: f64, judges: usize) {
    info!(
        event = "round.finished",
        round_index = round_index,
        overall_score = overall_score,
        ija = ija,
        judges = judges,
    );
}

/// Emit event: a round failed recoverably and was replaced by a placeholder.
pub fn emit_round_recovered(round_index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "round.recovered", round_index = round_index, error = %error);
}

/// Emit event: a judge was dropped from a round's panel.
pub fn emit_judge_dropped(judge_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "judge.dropped", judge_id = %judge_id, error = %error);
}

/// Emit event: completed rounds were seeded from a checkpoint.
pub fn emit_checkpoint_resumed(key: &str, resumed_rounds: usize, total_rounds: usize) {
    info!(
        event = "checkpoint.resumed",
        key = %key,
        resumed_rounds = resumed_rounds,
        total_rounds = total_rounds,
    );
}

/// Emit event: checkpoint save failed. The run continues.
pub fn emit_checkpoint_save_failed(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "checkpoint.save_failed", key = %key, error = %error);
}

/// Emit event: checkpoint clear failed after a successful run.
pub fn emit_checkpoint_clear_failed(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "checkpoint.clear_failed", key = %key, error = %error);
}

/// Emit event: non-strict sandbox validation reported a problem.
pub fn emit_sandbox_warning(round_index: usize, reason: &str) {
    warn!(event = "sandbox.warning", round_index = round_index, reason = %reason);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _span = RunSpan::enter("test-run-id");
        let _detached = RunSpan::span("other-run");
    }
}
