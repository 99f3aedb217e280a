//! Run-level aggregation of round results.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::evaluation::{AgreementLevel, DimensionScores};
use crate::domain::evidence::EvidenceEnvironment;
use crate::domain::run::{RoundResult, RoundStatus, RunRecord, TokenUsage};
use crate::evaluation::IJA_SIGMA_CEILING;
use crate::evidence::{clamp_monotonic, samples_from_rounds, timeline_from_rounds, EvidenceChainBuilder};
use crate::stats::{ci95_bounds, ci95_margin, mean, round1, round_to};

/// Identity and environment of the run being aggregated.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub target_model: String,
    pub system_model: String,
    pub judge_ids: Vec<String>,
    pub concurrency: usize,
    /// Rounds restored from a checkpoint, failed or not.
    pub resumed_rounds: usize,
}

/// Agreement implied by a mean IJA: `ija` is mapped back to the σ that
/// would produce it and classified with the per-round thresholds.
pub fn agreement_from_ija(mean_ija: f64) -> AgreementLevel {
    AgreementLevel::from_std_dev((1.0 - mean_ija) * IJA_SIGMA_CEILING)
}

/// Fold every round into a [`RunRecord`]. `rounds` must hold exactly one
/// entry per round; order does not matter.
pub fn aggregate_rounds(mut rounds: Vec<RoundResult>, meta: RunMeta) -> RunRecord {
    rounds.sort_by_key(|r| r.index);

    let overall: Vec<f64> = rounds.iter().map(|r| r.overall_score).collect();
    let raw_overall = mean(&overall);
    let dimension_scores = DimensionScores::from_fn(|key| {
        let values: Vec<f64> = rounds.iter().map(|r| r.dimension_scores.get(key)).collect();
        round1(mean(&values))
    });
    let raw_ija = mean(&rounds.iter().map(|r| r.ija).collect::<Vec<_>>());

    let mut warnings = Vec::new();
    let mut usage = TokenUsage::default();
    for round in &rounds {
        let number = round.index + 1;
        if let RoundStatus::Failed { reason } = &round.status {
            warnings.push(format!("round {number} failed: {reason}"));
        }
        warnings.extend(round.warnings.iter().map(|w| format!("round {number}: {w}")));
        usage += round.usage;
    }

    let timeline = clamp_monotonic(timeline_from_rounds(
        &rounds,
        meta.started_at,
        meta.completed_at,
    ));
    let samples = samples_from_rounds(&rounds);
    let mut builder = EvidenceChainBuilder::new()
        .timeline(timeline)
        .environment(EvidenceEnvironment {
            target_model: Some(meta.target_model.clone()),
            system_model: Some(meta.system_model.clone()),
            judge_models: meta.judge_ids.clone(),
            concurrency: Some(meta.concurrency),
            rounds: Some(rounds.len()),
            runner_version: crate::VERSION.to_string(),
        });
    if !samples.is_empty() {
        builder = builder.samples(samples);
    }
    let evidence = builder.build(meta.completed_at);

    RunRecord {
        run_id: meta.run_id,
        started_at: meta.started_at,
        completed_at: meta.completed_at,
        duration_ms: (meta.completed_at - meta.started_at)
            .num_milliseconds()
            .max(0) as u64,
        target_model: meta.target_model,
        judge_ids: meta.judge_ids,
        total_rounds: rounds.len(),
        failed_rounds: rounds.iter().filter(|r| r.is_failed()).count(),
        resumed_rounds: meta.resumed_rounds,
        overall_score: round1(raw_overall),
        dimension_scores,
        ci95: ci95_bounds(raw_overall, ci95_margin(&overall)),
        agreement_level: agreement_from_ija(raw_ija),
        mean_ija: round_to(raw_ija, 3),
        warnings,
        rounds,
        evidence,
        usage,
    }
}
