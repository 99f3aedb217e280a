//! Execution phase: budget resolution, the target-model call and response
//! parsing.

pub mod budget;
pub mod engine;
pub mod parser;

pub use budget::{resolve_execution_budget, ExecutionBudget};
pub use engine::{ExecutionEngine, ExecutionOutcome};
pub use parser::{parse_execution_response, ParsedResponse};
