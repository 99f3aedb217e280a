//! Domain models for codebench.
//!
//! Canonical definitions for the core entities:
//! - `Requirement` / `Complexity`: task input for a round
//! - `ExecutionResult`, `EvaluationResult`, `ScoreResult`: per-phase outputs
//! - `RoundResult` / `RunRecord`: round and run aggregates
//! - `EvidenceChain`: timeline and samples backing a run's score

pub mod error;
pub mod evaluation;
pub mod evidence;
pub mod requirement;
pub mod run;

// Re-export main types and errors
pub use error::{Disposition, DroppedJudge, PipelineError, ProviderError, Result};
pub use evaluation::{
    AgreementLevel, DimensionKey, DimensionScores, EvaluationResult, ExecutionResult, ScoreResult,
};
pub use evidence::{EvidenceChain, EvidenceEnvironment, EvidenceSample, PhaseEvent};
pub use requirement::{Complexity, ComplexitySetting, Requirement};
pub use run::{
    Phase, PhaseWindow, RoundResult, RoundStatus, RoundTimeline, RunRecord, TokenUsage,
};
