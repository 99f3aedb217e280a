//! Evaluation panel behaviour with partially failing judges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use codebench_core::{
    ChatRequest, ChatResponse, Complexity, Disposition, ExecutionResult, JudgeConfig,
    JudgeRoster, LlmProvider, PipelineError, ProviderError, Requirement, StaticProviderResolver,
    TokenUsage,
};
use codebench_core::evaluation::EvaluationPanel;

/// Judge provider keyed on the model name.
struct Judges;

#[async_trait]
impl LlmProvider for Judges {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let content = match request.model.as_str() {
            "steady" => r#"{"functionalCompleteness":80,"codeQuality":80,"logicAccuracy":80,"security":80,"engineeringPractice":80}"#,
            "close" => r#"```json
{"scores":{"functionalCompleteness":82,"codeQuality":79,"logicAccuracy":81,"security":80,"engineeringPractice":78}}
```"#,
            "harsh" => r#"{"functionalCompleteness":20,"codeQuality":20,"logicAccuracy":20,"security":20,"engineeringPractice":20}"#,
            "slow" => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                "{}"
            }
            "down" => return Err(ProviderError::Transport("connection refused".to_string())),
            "flaky" => return Err(ProviderError::RetriesExhausted {
                attempts: 3,
                reason: "429".to_string(),
            }),
            _ => "no scores here",
        };
        Ok(ChatResponse {
            content: content.to_string(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
            },
            latency_ms: 3,
        })
    }
}

fn roster(models: &[&str]) -> JudgeRoster {
    let resolver = StaticProviderResolver::new().with_provider("judge", Arc::new(Judges));
    let judges: Vec<JudgeConfig> = models.iter().map(|m| JudgeConfig::new("judge", *m)).collect();
    JudgeRoster::resolve(&judges, &resolver).expect("resolve judges")
}

fn requirement() -> Requirement {
    Requirement {
        title: "Bounded queue".to_string(),
        functional_requirements: vec!["push and pop".to_string()],
        constraints: vec!["no unsafe".to_string()],
        complexity: Complexity::C2,
    }
}

fn execution() -> ExecutionResult {
    ExecutionResult {
        code: "pub struct Queue;".to_string(),
        language: "rust".to_string(),
        timeout_ms: 60_000,
        max_tokens: 8_192,
    }
}

#[tokio::test]
async fn test_failing_judge_is_dropped_and_reported() {
    let panel = EvaluationPanel::new();
    let outcome = panel
        .evaluate_with_ija(&requirement(), &execution(), &roster(&["steady", "down", "close"]))
        .await
        .expect("two judges survive");

    assert_eq!(outcome.outcome.results.len(), 2);
    assert_eq!(outcome.outcome.dropped_judges.len(), 1);
    let dropped = &outcome.outcome.dropped_judges[0];
    assert_eq!(dropped.judge_id, "judge/down");
    assert_eq!(dropped.disposition, Disposition::Fatal);
    assert!(outcome.ija > 0.9);
    assert_eq!(outcome.outcome.usage.total(), 240);
}

#[tokio::test]
async fn test_duplicate_judges_are_called_once() {
    let panel = EvaluationPanel::new();
    let outcome = panel
        .evaluate(&requirement(), &execution(), &roster(&["steady", "steady"]))
        .await
        .expect("judge succeeds");
    assert_eq!(outcome.results.len(), 1);
}

#[tokio::test]
async fn test_divergent_judges_have_zero_agreement() {
    let panel = EvaluationPanel::new();
    let outcome = panel
        .evaluate_with_ija(&requirement(), &execution(), &roster(&["steady", "harsh"]))
        .await
        .expect("both judges succeed");
    // overall 80 vs 20: σ = 30, clamped
    assert_eq!(outcome.ija, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_judge_times_out_recoverably() {
    let panel = EvaluationPanel::new().with_judge_timeout(Duration::from_secs(5));
    let outcome = panel
        .evaluate(&requirement(), &execution(), &roster(&["slow", "steady"]))
        .await
        .expect("steady judge survives");
    assert_eq!(outcome.dropped_judges.len(), 1);
    assert_eq!(outcome.dropped_judges[0].disposition, Disposition::Recoverable);
    assert!(outcome.dropped_judges[0].reason.contains("timed out"));
}

#[tokio::test]
async fn test_all_judges_failed_carries_every_failure() {
    let panel = EvaluationPanel::new();
    let err = panel
        .evaluate(&requirement(), &execution(), &roster(&["down", "garbled"]))
        .await
        .expect_err("no judge survives");

    match &err {
        PipelineError::AllJudgesFailed { failures } => {
            let ids: Vec<&str> = failures.iter().map(|f| f.judge_id.as_str()).collect();
            assert_eq!(ids, vec!["judge/down", "judge/garbled"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_all_judges_exhausting_retries_is_recoverable() {
    let panel = EvaluationPanel::new();
    let err = panel
        .evaluate(&requirement(), &execution(), &roster(&["flaky"]))
        .await
        .expect_err("no judge survives");
    assert!(err.is_recoverable());
}
