use std::time::Duration;

use tracing::debug;

use crate::domain::error::{PipelineError, Result};
use crate::domain::evaluation::ExecutionResult;
use crate::domain::requirement::Requirement;
use crate::domain::run::TokenUsage;
use crate::provider::{ChatMessage, ProviderHandle};

use super::budget::resolve_execution_budget;
use super::parser::parse_execution_response;

const EXECUTION_SYSTEM_PROMPT: &str = "You are a senior software engineer. Implement the \
requirement you are given as a single, complete, runnable source file. Respond with a JSON \
object of the form {\"language\": \"<language>\", \"code\": \"<source>\"} and nothing else.";

/// Execution output plus the tokens it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub result: ExecutionResult,
    pub usage: TokenUsage,
}

/// Runs the target model against a requirement within its tier budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionEngine;

impl ExecutionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Ask `target` to implement `requirement`.
    ///
    /// The call is bounded by the tier's `timeout_ms`; exceeding it yields a
    /// recoverable [`PipelineError::Timeout`].
    pub async fn execute(
        &self,
        requirement: &Requirement,
        target: &ProviderHandle,
        temperature: Option<f32>,
    ) -> Result<ExecutionOutcome> {
        let budget = resolve_execution_budget(requirement.complexity);
        let messages = vec![
            ChatMessage::system(EXECUTION_SYSTEM_PROMPT),
            ChatMessage::user(requirement.render()),
        ];

        let call = target.chat(messages, temperature, Some(budget.max_tokens), None);
        let response = tokio::time::timeout(Duration::from_millis(budget.timeout_ms), call)
            .await
            .map_err(|_| PipelineError::Timeout {
                operation: format!("execution by {}", target.id()),
                limit_ms: budget.timeout_ms,
            })??;

        let parsed = parse_execution_response(&response.content)?;
        debug!(
            model = %target.id(),
            language = %parsed.language,
            code_len = parsed.code.len(),
            latency_ms = response.latency_ms,
            "execution parsed"
        );

        Ok(ExecutionOutcome {
            result: ExecutionResult {
                code: parsed.code,
                language: parsed.language,
                timeout_ms: budget.timeout_ms,
                max_tokens: budget.max_tokens,
            },
            usage: response.usage,
        })
    }
}
