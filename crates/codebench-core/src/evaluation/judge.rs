//! Judge prompt construction and score parsing.

use serde_json::Value;

use crate::domain::error::{PipelineError, Result};
use crate::domain::evaluation::{DimensionKey, DimensionScores, ExecutionResult};
use crate::domain::requirement::Requirement;
use crate::provider::ChatMessage;

const JUDGE_SYSTEM_PROMPT: &str = "You are an impartial reviewer grading a code submission \
against its requirement. Score each dimension from 0 to 100. Respond with a JSON object with \
exactly these numeric fields: functionalCompleteness, codeQuality, logicAccuracy, security, \
engineeringPractice.";

/// Messages sent to every judge for one round. Identical across judges.
pub fn build_judge_messages(
    requirement: &Requirement,
    execution: &ExecutionResult,
) -> Vec<ChatMessage> {
    let user = format!(
        "## Requirement\n\n{}\n## Submission ({})\n\n```{}\n{}\n```\n",
        requirement.render(),
        execution.language,
        execution.language,
        execution.code
    );
    vec![ChatMessage::system(JUDGE_SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Parse a judge's reply into dimension scores clamped to 0..100.
///
/// Accepts a bare JSON object, a fenced JSON block, or an object embedded in
/// prose. Scores may sit at the top level or under `dimensions`/`scores`.
pub fn parse_judge_scores(raw: &str) -> Result<DimensionScores> {
    let value = extract_json_object(raw)
        .ok_or_else(|| PipelineError::Parse("judge reply contains no JSON object".to_string()))?;
    let container = ["dimensions", "scores"]
        .iter()
        .find_map(|k| value.get(*k).filter(|v| v.is_object()))
        .unwrap_or(&value);

    let mut scores = DimensionScores::default();
    for key in DimensionKey::ALL {
        let score = container
            .get(key.as_str())
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                PipelineError::Parse(format!("judge reply missing numeric {key}"))
            })?;
        scores.set(key, score.clamp(0.0, 100.0));
    }
    Ok(scores)
}

fn extract_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::requirement::Complexity;

    const FULL: &str = r#"{"functionalCompleteness":80,"codeQuality":70,"logicAccuracy":90,"security":85,"engineeringPractice":75}"#;

    #[test]
    fn test_parses_bare_object() {
        let scores = parse_judge_scores(FULL).unwrap();
        assert_eq!(scores.functional_completeness, 80.0);
        assert_eq!(scores.engineering_practice, 75.0);
    }

    #[test]
    fn test_parses_fenced_and_nested_objects() {
        let fenced = format!("Verdict:\n```json\n{{\"dimensions\": {FULL}}}\n```");
        let scores = parse_judge_scores(&fenced).unwrap();
        assert_eq!(scores.logic_accuracy, 90.0);
    }

    #[test]
    fn test_clamps_out_of_range_scores() {
        let raw = r#"{"functionalCompleteness":130,"codeQuality":-5,"logicAccuracy":50,"security":50,"engineeringPractice":50}"#;
        let scores = parse_judge_scores(raw).unwrap();
        assert_eq!(scores.functional_completeness, 100.0);
        assert_eq!(scores.code_quality, 0.0);
    }

    #[test]
    fn test_missing_dimension_is_parse_error() {
        let raw = r#"{"functionalCompleteness":80}"#;
        let err = parse_judge_scores(raw).unwrap_err();
        assert!(err.to_string().contains("codeQuality"));
    }

    #[test]
    fn test_judge_messages_embed_code() {
        let requirement = Requirement {
            title: "LRU".to_string(),
            functional_requirements: vec![],
            constraints: vec![],
            complexity: Complexity::C1,
        };
        let execution = ExecutionResult {
            code: "struct Lru;".to_string(),
            language: "rust".to_string(),
            timeout_ms: 30_000,
            max_tokens: 4_096,
        };
        let messages = build_judge_messages(&requirement, &execution);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("```rust\nstruct Lru;\n```"));
    }
}
