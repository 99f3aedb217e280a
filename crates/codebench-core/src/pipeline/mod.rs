//! Benchmark pipeline: round orchestration, consumed collaborators and
//! run-level aggregation.

pub mod aggregate;
pub mod collaborators;
pub mod orchestrator;

pub use aggregate::{aggregate_rounds, agreement_from_ija, RunMeta};
pub use collaborators::{
    GeneratedRequirement, GenerationInput, ProgressEvent, ProgressSink, ProgressState,
    RequirementGenerator, SandboxContext, SandboxRunner, TracingProgressSink,
};
pub use orchestrator::{PipelineOrchestrator, RunInput};
