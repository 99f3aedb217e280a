//! Multi-judge evaluation panel.
//!
//! Every judge scores the same (requirement, execution) pair independently
//! and concurrently. A failing judge is dropped from the round; the panel
//! only fails when no judge survives.

use std::time::Duration;

use futures::future::join_all;
use tracing::{instrument, warn};

use crate::config::{distinct_judges, JudgeConfig};
use crate::domain::error::{DroppedJudge, PipelineError, Result};
use crate::domain::evaluation::{EvaluationResult, ExecutionResult};
use crate::domain::requirement::Requirement;
use crate::domain::run::TokenUsage;
use crate::provider::{ProviderHandle, ProviderResolver, ResponseFormat};
use crate::stats::{round_to, std_dev};

use super::judge::{build_judge_messages, parse_judge_scores};

/// σ of per-judge overall scores at which agreement bottoms out at zero.
pub const IJA_SIGMA_CEILING: f64 = 25.0;

const JUDGE_TEMPERATURE: f32 = 0.0;
const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Judges resolved to provider handles, built once per run.
#[derive(Debug, Clone, Default)]
pub struct JudgeRoster {
    members: Vec<(JudgeConfig, ProviderHandle)>,
}

impl JudgeRoster {
    /// Resolve each distinct `provider/model` judge once.
    pub fn resolve(judges: &[JudgeConfig], resolver: &dyn ProviderResolver) -> Result<Self> {
        let mut members = Vec::new();
        for judge in distinct_judges(judges) {
            let handle = resolver.resolve(&judge.provider, &judge.model)?;
            members.push((judge.clone(), handle));
        }
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn judge_ids(&self) -> Vec<String> {
        self.members.iter().map(|(j, _)| j.id()).collect()
    }
}

/// Surviving judge results for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelOutcome {
    pub results: Vec<EvaluationResult>,
    pub dropped_judges: Vec<DroppedJudge>,
    pub usage: TokenUsage,
}

/// [`PanelOutcome`] plus inter-judge agreement.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelOutcomeWithIja {
    pub outcome: PanelOutcome,
    pub ija: f64,
}

#[derive(Debug, Clone)]
pub struct EvaluationPanel {
    judge_timeout: Duration,
}

impl Default for EvaluationPanel {
    fn default() -> Self {
        Self {
            judge_timeout: DEFAULT_JUDGE_TIMEOUT,
        }
    }
}

impl EvaluationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-judge wall-clock limit. A judge exceeding it is dropped with a
    /// recoverable disposition.
    pub fn with_judge_timeout(mut self, timeout: Duration) -> Self {
        self.judge_timeout = timeout;
        self
    }

    /// Score `execution` with every judge in `roster`.
    ///
    /// Returns [`PipelineError::AllJudgesFailed`] when no judge succeeds.
    #[instrument(skip_all, fields(judges = roster.len()))]
    pub async fn evaluate(
        &self,
        requirement: &Requirement,
        execution: &ExecutionResult,
        roster: &JudgeRoster,
    ) -> Result<PanelOutcome> {
        let messages = build_judge_messages(requirement, execution);

        let calls = roster.members.iter().map(|(judge, handle)| {
            let messages = messages.clone();
            async move {
                let judge_id = judge.id();
                let call = handle.chat(
                    messages,
                    Some(JUDGE_TEMPERATURE),
                    None,
                    Some(ResponseFormat::JsonObject),
                );
                let outcome = match tokio::time::timeout(self.judge_timeout, call).await {
                    Err(_) => Err(PipelineError::Timeout {
                        operation: format!("judge {judge_id}"),
                        limit_ms: self.judge_timeout.as_millis() as u64,
                    }),
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(response)) => parse_judge_scores(&response.content)
                        .map(|dimensions| (dimensions, response.usage)),
                };
                (judge_id, outcome)
            }
        });

        let mut results = Vec::new();
        let mut dropped_judges = Vec::new();
        let mut usage = TokenUsage::default();

        for (judge_id, outcome) in join_all(calls).await {
            match outcome {
                Ok((dimensions, call_usage)) => {
                    usage += call_usage;
                    results.push(EvaluationResult {
                        judge_id,
                        dimensions,
                    });
                }
                Err(e) => {
                    warn!(judge = %judge_id, error = %e, "judge failed; dropping from panel");
                    crate::obs::emit_judge_dropped(&judge_id, &e);
                    dropped_judges.push(DroppedJudge {
                        judge_id,
                        reason: e.to_string(),
                        disposition: e.disposition(),
                    });
                }
            }
        }

        if results.is_empty() {
            return Err(PipelineError::AllJudgesFailed {
                failures: dropped_judges,
            });
        }

        Ok(PanelOutcome {
            results,
            dropped_judges,
            usage,
        })
    }

    /// [`evaluate`](Self::evaluate) followed by [`calculate_ija`].
    pub async fn evaluate_with_ija(
        &self,
        requirement: &Requirement,
        execution: &ExecutionResult,
        roster: &JudgeRoster,
    ) -> Result<PanelOutcomeWithIja> {
        let outcome = self.evaluate(requirement, execution, roster).await?;
        let ija = calculate_ija(&outcome.results);
        Ok(PanelOutcomeWithIja { outcome, ija })
    }
}

/// Inter-judge agreement: `1 − min(σ / 25, 1)` over each judge's unweighted
/// overall score, rounded to three decimals. One judge (or none) agrees with
/// itself: `1.0`.
pub fn calculate_ija(results: &[EvaluationResult]) -> f64 {
    if results.len() <= 1 {
        return 1.0;
    }
    let overall: Vec<f64> = results.iter().map(EvaluationResult::overall).collect();
    let ratio = (std_dev(&overall) / IJA_SIGMA_CEILING).min(1.0);
    round_to(1.0 - ratio, 3)
}
