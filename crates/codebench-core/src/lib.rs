//! codebench core library
//!
//! Benchmarks a target code-generation model: each round generates a
//! requirement, has the target implement it, scores the submission with a
//! panel of judge models and aggregates the rounds into a [`RunRecord`] with
//! a confidence interval and an evidence chain.

pub mod config;
pub mod domain;
pub mod evaluation;
pub mod evidence;
pub mod execution;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod provider;
pub mod reporting;
pub mod scoring;
pub mod stats;
pub mod telemetry;

/// Crate version, recorded in every evidence chain.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{DimensionWeights, JudgeConfig, ModelConfig, PipelineConfig, SandboxSettings};

pub use domain::{
    AgreementLevel, Complexity, ComplexitySetting, DimensionKey, DimensionScores, Disposition,
    DroppedJudge, EvaluationResult, EvidenceChain, EvidenceEnvironment, EvidenceSample,
    ExecutionResult, Phase, PhaseEvent, PhaseWindow, PipelineError, ProviderError, Requirement,
    Result, RoundResult, RoundStatus, RoundTimeline, RunRecord, ScoreResult, TokenUsage,
};

pub use evaluation::{calculate_ija, EvaluationPanel, JudgeRoster, PanelOutcome, PanelOutcomeWithIja};
pub use evidence::{clamp_monotonic, EvidenceChainBuilder};
pub use execution::{
    parse_execution_response, resolve_execution_budget, ExecutionBudget, ExecutionEngine,
    ParsedResponse,
};
pub use pipeline::{
    GeneratedRequirement, GenerationInput, PipelineOrchestrator, ProgressEvent, ProgressSink,
    ProgressState, RequirementGenerator, RunInput, SandboxContext, SandboxRunner,
    TracingProgressSink,
};
pub use provider::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmProvider, ProviderHandle,
    ProviderResolver, ResponseFormat, StaticProviderResolver,
};
pub use reporting::{render_run_summary_md, write_run_record_json, write_run_summary_md};
pub use scoring::ScoringEngine;

pub use codebench_state::{
    CheckpointStore, FsCheckpointStore, PipelineCheckpoint, PipelineRoundSnapshot, StorageError,
};
