//! Collaborators the orchestrator consumes but does not implement:
//! requirement generation, sandbox validation and progress reporting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::Result;
use crate::domain::requirement::{Complexity, Requirement};
use crate::domain::run::{Phase, TokenUsage};
use crate::provider::ProviderHandle;

/// What the generator is asked to produce for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInput {
    pub round_index: usize,
    pub complexity: Complexity,
    pub domain: Option<String>,
}

/// A generated requirement and the tokens spent producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRequirement {
    pub requirement: Requirement,
    pub usage: TokenUsage,
}

impl From<Requirement> for GeneratedRequirement {
    fn from(requirement: Requirement) -> Self {
        Self {
            requirement,
            usage: TokenUsage::default(),
        }
    }
}

/// Produces the task for a round using the system model. Failures are
/// classified by their [`PipelineError`](crate::PipelineError) variant like
/// any other phase.
#[async_trait]
pub trait RequirementGenerator: Send + Sync {
    async fn generate(
        &self,
        input: &GenerationInput,
        system_model: &ProviderHandle,
    ) -> Result<GeneratedRequirement>;
}

/// Context handed to the sandbox runner alongside the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxContext {
    pub round_index: usize,
    pub requirement_title: String,
    pub language: String,
}

/// Validates generated code before it is judged. An `Err` means the code is
/// invalid or unsafe; its message becomes the failure reason.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(&self, code: &str, context: &SandboxContext) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Started,
    Completed,
    Failed,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub round_index: usize,
    pub total_rounds: usize,
    pub phase: Phase,
    pub state: ProgressState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Receives round progress. Best effort: the sink cannot fail the run.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, event: ProgressEvent);
}

/// Default sink: logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

#[async_trait]
impl ProgressSink for TracingProgressSink {
    async fn on_progress(&self, event: ProgressEvent) {
        let message = event.message.as_deref().unwrap_or("");
        match event.state {
            ProgressState::Failed | ProgressState::Warning => warn!(
                round = event.round_index + 1,
                total = event.total_rounds,
                phase = %event.phase,
                state = ?event.state,
                detail = message,
                "round progress"
            ),
            ProgressState::Started | ProgressState::Completed => debug!(
                round = event.round_index + 1,
                total = event.total_rounds,
                phase = %event.phase,
                state = ?event.state,
                "round progress"
            ),
        }
    }
}
