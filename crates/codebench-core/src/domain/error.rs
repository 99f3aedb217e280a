//! Pipeline error taxonomy.
//!
//! Every error carries its round-level [`Disposition`] explicitly. The
//! orchestrator never inspects messages to decide whether a round failure can
//! be converted into a zero-score placeholder.

use serde::{Deserialize, Serialize};

use codebench_state::StorageError;

/// Whether a failure can be absorbed at round level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The round is replaced with a zero-score placeholder; the run continues.
    Recoverable,
    /// The whole run aborts.
    Fatal,
}

impl Disposition {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Disposition::Recoverable)
    }
}

/// A judge removed from a round's panel after failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedJudge {
    pub judge_id: String,
    pub reason: String,
    pub disposition: Disposition,
}

/// Errors returned by consumed [`LlmProvider`](crate::provider::LlmProvider)s.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("provider call aborted: {0}")]
    Aborted(String),

    #[error("provider retries exhausted after {attempts} attempt(s): {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    #[error("provider transport error: {0}")]
    Transport(String),
}

/// Errors produced by the benchmark pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("checkpoint was recorded for {found} rounds but this run is configured for {expected}")]
    CheckpointMismatch { expected: usize, found: usize },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {limit_ms}ms")]
    Timeout { operation: String, limit_ms: u64 },

    #[error("operation aborted: {0}")]
    Aborted(String),

    #[error("retries exhausted after {attempts} attempt(s): {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    #[error("sandbox validation failed for round {round_index}: {reason}")]
    SandboxValidation { round_index: usize, reason: String },

    #[error("all {} judges failed", failures.len())]
    AllJudgesFailed { failures: Vec<DroppedJudge> },

    #[error("unparseable response: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("round worker panicked: {0}")]
    WorkerPanicked(String),
}

impl PipelineError {
    /// Round-level classification of this error.
    pub fn disposition(&self) -> Disposition {
        match self {
            PipelineError::Timeout { .. }
            | PipelineError::Aborted(_)
            | PipelineError::RetriesExhausted { .. }
            | PipelineError::SandboxValidation { .. } => Disposition::Recoverable,
            PipelineError::AllJudgesFailed { failures } => {
                if !failures.is_empty()
                    && failures.iter().all(|f| f.disposition.is_recoverable())
                {
                    Disposition::Recoverable
                } else {
                    Disposition::Fatal
                }
            }
            _ => Disposition::Fatal,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.disposition().is_recoverable()
    }
}

impl From<ProviderError> for PipelineError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout { elapsed_ms } => PipelineError::Timeout {
                operation: "provider call".to_string(),
                limit_ms: elapsed_ms,
            },
            ProviderError::Aborted(reason) => PipelineError::Aborted(reason),
            ProviderError::RetriesExhausted { attempts, reason } => {
                PipelineError::RetriesExhausted { attempts, reason }
            }
            ProviderError::Transport(reason) => PipelineError::Transport(reason),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
