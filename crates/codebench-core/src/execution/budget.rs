//! Execution budget per complexity tier.

use serde::{Deserialize, Serialize};

use crate::domain::requirement::Complexity;

/// Wall-clock and token limits for one execution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBudget {
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

/// Fixed budget for `complexity`.
pub fn resolve_execution_budget(complexity: Complexity) -> ExecutionBudget {
    let (timeout_ms, max_tokens) = match complexity {
        Complexity::C1 => (30_000, 4_096),
        Complexity::C2 => (60_000, 8_192),
        Complexity::C3 => (120_000, 16_384),
        Complexity::C4 => (180_000, 32_768),
    };
    ExecutionBudget {
        timeout_ms,
        max_tokens,
    }
}
