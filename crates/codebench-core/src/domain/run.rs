//! Round and run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use codebench_state::PipelineRoundSnapshot;

use super::error::DroppedJudge;
use super::evaluation::{AgreementLevel, DimensionScores};
use super::evidence::EvidenceChain;
use super::requirement::Complexity;

/// Pipeline phase. `Sandbox` only appears in progress events; the evidence
/// timeline records the four [`Phase::TIMELINE`] phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Generate,
    Execute,
    Sandbox,
    Evaluate,
    Score,
}

impl Phase {
    /// Timeline phases in their required order.
    pub const TIMELINE: [Phase; 4] = [Phase::Generate, Phase::Execute, Phase::Evaluate, Phase::Score];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Generate => "generate",
            Phase::Execute => "execute",
            Phase::Sandbox => "sandbox",
            Phase::Evaluate => "evaluate",
            Phase::Score => "score",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start and end of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseWindow {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl PhaseWindow {
    pub fn new(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            completed_at,
        }
    }

    /// Zero-length window at `at`.
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self::new(at, at)
    }
}

/// Per-phase windows observed for one round. Phases that never ran are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTimeline {
    pub generate: Option<PhaseWindow>,
    pub execute: Option<PhaseWindow>,
    pub evaluate: Option<PhaseWindow>,
    pub score: Option<PhaseWindow>,
}

impl RoundTimeline {
    /// Every timeline phase set to the same instant.
    pub fn backfilled(at: DateTime<Utc>) -> Self {
        let window = Some(PhaseWindow::instant(at));
        Self {
            generate: window,
            execute: window,
            evaluate: window,
            score: window,
        }
    }

    pub fn get(&self, phase: Phase) -> Option<PhaseWindow> {
        match phase {
            Phase::Generate => self.generate,
            Phase::Execute => self.execute,
            Phase::Evaluate => self.evaluate,
            Phase::Score => self.score,
            Phase::Sandbox => None,
        }
    }

    pub fn set(&mut self, phase: Phase, window: PhaseWindow) {
        match phase {
            Phase::Generate => self.generate = Some(window),
            Phase::Execute => self.execute = Some(window),
            Phase::Evaluate => self.evaluate = Some(window),
            Phase::Score => self.score = Some(window),
            Phase::Sandbox => {}
        }
    }
}

/// Prompt/completion token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
    }
}

/// How a round reached its final state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoundStatus {
    Completed,
    /// Replaced with a zero-score placeholder after a recoverable failure.
    Failed { reason: String },
    /// Seeded from a checkpoint instead of being executed.
    Resumed,
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub index: usize,
    pub status: RoundStatus,
    pub complexity: Option<Complexity>,
    pub requirement_title: String,
    pub requirement_text: Option<String>,
    pub code_submission: Option<String>,
    pub language: Option<String>,
    pub overall_score: f64,
    pub dimension_scores: DimensionScores,
    pub ija: f64,
    pub ci95: Option<[f64; 2]>,
    pub agreement_level: Option<AgreementLevel>,
    pub warnings: Vec<String>,
    pub dropped_judges: Vec<DroppedJudge>,
    pub timeline: RoundTimeline,
    pub usage: TokenUsage,
}

impl RoundResult {
    /// Zero-score placeholder for a round that failed recoverably.
    pub fn failed_placeholder(
        index: usize,
        title: Option<&str>,
        reason: String,
        timeline: RoundTimeline,
        usage: TokenUsage,
    ) -> Self {
        let base = title
            .map(str::to_string)
            .unwrap_or_else(|| format!("Round {}", index + 1));
        Self {
            index,
            status: RoundStatus::Failed { reason },
            complexity: None,
            requirement_title: format!("{base} (failed)"),
            requirement_text: None,
            code_submission: None,
            language: None,
            overall_score: 0.0,
            dimension_scores: DimensionScores::default(),
            ija: 0.0,
            ci95: None,
            agreement_level: None,
            warnings: Vec::new(),
            dropped_judges: Vec::new(),
            timeline,
            usage,
        }
    }

    /// Rebuild a round from a checkpoint snapshot. Sub-timings are not
    /// persisted, so every phase is backfilled to `checkpoint_created_at`.
    /// A snapshot of a failed placeholder comes back as failed.
    pub fn from_snapshot(
        snapshot: &PipelineRoundSnapshot,
        checkpoint_created_at: DateTime<Utc>,
    ) -> Self {
        let status = match &snapshot.failure_reason {
            Some(reason) => RoundStatus::Failed {
                reason: reason.clone(),
            },
            None => RoundStatus::Resumed,
        };
        Self {
            index: snapshot.index,
            status,
            complexity: None,
            requirement_title: snapshot.requirement_title.clone(),
            requirement_text: snapshot.requirement_text.clone(),
            code_submission: snapshot.code_submission.clone(),
            language: None,
            overall_score: snapshot.overall_score,
            dimension_scores: snapshot.dimension_scores,
            ija: snapshot.ija,
            ci95: None,
            agreement_level: None,
            warnings: Vec::new(),
            dropped_judges: Vec::new(),
            timeline: RoundTimeline::backfilled(checkpoint_created_at),
            usage: TokenUsage::default(),
        }
    }

    pub fn to_snapshot(&self) -> PipelineRoundSnapshot {
        PipelineRoundSnapshot {
            index: self.index,
            overall_score: self.overall_score,
            dimension_scores: self.dimension_scores,
            ija: self.ija,
            requirement_title: self.requirement_title.clone(),
            requirement_text: self.requirement_text.clone(),
            code_submission: self.code_submission.clone(),
            failure_reason: match &self.status {
                RoundStatus::Failed { reason } => Some(reason.clone()),
                RoundStatus::Completed | RoundStatus::Resumed => None,
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RoundStatus::Failed { .. })
    }
}

/// Terminal aggregate of one pipeline invocation. Never mutated after
/// [`PipelineOrchestrator::run`](crate::pipeline::PipelineOrchestrator::run)
/// returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub target_model: String,
    pub judge_ids: Vec<String>,
    pub total_rounds: usize,
    pub failed_rounds: usize,
    pub resumed_rounds: usize,
    pub overall_score: f64,
    pub dimension_scores: DimensionScores,
    pub ci95: [f64; 2],
    pub agreement_level: AgreementLevel,
    pub mean_ija: f64,
    pub warnings: Vec<String>,
    pub rounds: Vec<RoundResult>,
    pub evidence: EvidenceChain,
    pub usage: TokenUsage,
}
