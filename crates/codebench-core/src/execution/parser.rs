//! Extracts `{code, language}` from a target-model response.
//!
//! Tried in order: strict JSON (`{"code": ..}` or `{"files": [{"content": ..}]}`),
//! then the first fenced code block. Anything else is a parse error.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{PipelineError, Result};

pub const DEFAULT_JSON_LANGUAGE: &str = "typescript";
pub const DEFAULT_FENCE_LANGUAGE: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub code: String,
    pub language: String,
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```([A-Za-z0-9_+.#-]*)[ \t]*\r?\n([\s\S]*?)\r?\n[ \t]*```")
            .expect("fence pattern is valid")
    })
}

/// Parse a raw execution response.
pub fn parse_execution_response(raw: &str) -> Result<ParsedResponse> {
    if let Some(parsed) = parse_json_payload(raw) {
        return Ok(parsed);
    }
    if let Some(parsed) = parse_fenced_block(raw) {
        return Ok(parsed);
    }
    Err(PipelineError::Parse(format!(
        "response contains neither a JSON code payload nor a fenced code block ({} chars)",
        raw.len()
    )))
}

fn parse_json_payload(raw: &str) -> Option<ParsedResponse> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    let object = value.as_object()?;
    let top_language = object.get("language").and_then(Value::as_str);

    if let Some(code) = object.get("code").and_then(Value::as_str) {
        return Some(ParsedResponse {
            code: code.to_string(),
            language: top_language.unwrap_or(DEFAULT_JSON_LANGUAGE).to_string(),
        });
    }

    let first = object.get("files")?.as_array()?.first()?;
    let content = first.get("content").and_then(Value::as_str)?;
    let language = top_language
        .or_else(|| first.get("language").and_then(Value::as_str))
        .unwrap_or(DEFAULT_JSON_LANGUAGE);
    Some(ParsedResponse {
        code: content.to_string(),
        language: language.to_string(),
    })
}

fn parse_fenced_block(raw: &str) -> Option<ParsedResponse> {
    let captures = fence_pattern().captures(raw)?;
    let language = captures
        .get(1)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FENCE_LANGUAGE);
    let body = captures.get(2)?.as_str().replace("\r\n", "\n");
    let code = body.trim();
    if code.is_empty() {
        return None;
    }
    Some(ParsedResponse {
        code: code.to_string(),
        language: language.to_string(),
    })
}
