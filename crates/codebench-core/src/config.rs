//! Pipeline run configuration.
//!
//! Loaded from camelCase JSON, optionally overridden from the environment,
//! then validated before a run starts.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::error::{PipelineError, Result};
use crate::domain::evaluation::{DimensionKey, DimensionScores};
use crate::domain::requirement::ComplexitySetting;

pub const ENV_ROUNDS: &str = "CODEBENCH_ROUNDS";
pub const ENV_CONCURRENCY: &str = "CODEBENCH_CONCURRENCY";
pub const ENV_SANDBOX_STRICT: &str = "CODEBENCH_SANDBOX_STRICT";

/// A provider + model pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ModelConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature: None,
        }
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

/// One judge of the evaluation panel.
///
/// `weight` is carried for identification and reporting; the trimmed-mean
/// scoring does not apply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeConfig {
    pub provider: String,
    pub model: String,
    #[serde(default = "default_judge_weight")]
    pub weight: f64,
}

fn default_judge_weight() -> f64 {
    1.0
}

impl JudgeConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            weight: default_judge_weight(),
        }
    }

    /// `provider/model`
    pub fn id(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

/// Per-dimension weights for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionWeights(pub DimensionScores);

impl Default for DimensionWeights {
    fn default() -> Self {
        Self(DimensionScores {
            functional_completeness: 0.3,
            code_quality: 0.25,
            logic_accuracy: 0.25,
            security: 0.1,
            engineering_practice: 0.1,
        })
    }
}

impl DimensionWeights {
    pub fn weight(&self, key: DimensionKey) -> f64 {
        self.0.get(key)
    }

    pub fn total(&self) -> f64 {
        DimensionKey::ALL.iter().map(|k| self.weight(*k)).sum()
    }

    /// Weighted average of `scores`, normalized by the weight total.
    pub fn apply(&self, scores: &DimensionScores) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return scores.mean();
        }
        DimensionKey::ALL
            .iter()
            .map(|k| self.weight(*k) * scores.get(*k))
            .sum::<f64>()
            / total
    }
}

/// Sandbox validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Strict mode fails the round on a sandbox error; non-strict only warns.
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            strict: true,
        }
    }
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub rounds: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub complexity: ComplexitySetting,
    pub system_model: ModelConfig,
    pub target_model: ModelConfig,
    pub judges: Vec<JudgeConfig>,
    #[serde(default)]
    pub dimension_weights: DimensionWeights,
    #[serde(default)]
    pub sandbox: SandboxSettings,
    /// Free-form topic handed to the requirement generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Judges deduplicated by `provider/model`, first occurrence wins.
pub fn distinct_judges(judges: &[JudgeConfig]) -> Vec<&JudgeConfig> {
    let mut seen = HashSet::new();
    judges.iter().filter(|j| seen.insert(j.id())).collect()
}

impl PipelineConfig {
    pub fn new(
        rounds: usize,
        system_model: ModelConfig,
        target_model: ModelConfig,
        judges: Vec<JudgeConfig>,
    ) -> Self {
        Self {
            rounds,
            concurrency: default_concurrency(),
            complexity: ComplexitySetting::default(),
            system_model,
            target_model,
            judges,
            dimension_weights: DimensionWeights::default(),
            sandbox: SandboxSettings::default(),
            domain: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Apply `CODEBENCH_*` overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(self)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(ENV_ROUNDS) {
            self.rounds = parse_override(ENV_ROUNDS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            self.concurrency = parse_override(ENV_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SANDBOX_STRICT) {
            self.sandbox.strict = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(PipelineError::Configuration(format!(
                        "{ENV_SANDBOX_STRICT} must be a boolean, got {other:?}"
                    )))
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(PipelineError::Configuration(
                "rounds must be at least 1".to_string(),
            ));
        }
        if self.judges.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one judge is required".to_string(),
            ));
        }
        for model in [&self.system_model, &self.target_model] {
            if model.provider.trim().is_empty() || model.model.trim().is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "model config {:?} is incomplete",
                    model.id()
                )));
            }
        }
        for key in DimensionKey::ALL {
            let w = self.dimension_weights.weight(key);
            if !w.is_finite() || w < 0.0 {
                return Err(PipelineError::Configuration(format!(
                    "weight for {key} must be a non-negative number"
                )));
            }
        }
        if self.dimension_weights.total() <= 0.0 {
            return Err(PipelineError::Configuration(
                "dimension weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Checkpoint key derived from every field that shapes round results.
    /// Concurrency is excluded: it changes scheduling, not outcomes.
    pub fn checkpoint_key(&self) -> String {
        let signature = serde_json::json!({
            "rounds": self.rounds,
            "complexity": self.complexity,
            "systemModel": self.system_model,
            "targetModel": self.target_model,
            "judges": self.judges,
            "dimensionWeights": self.dimension_weights,
            "sandbox": self.sandbox,
            "domain": self.domain,
        });
        let mut hasher = Sha256::new();
        hasher.update(signature.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("pipeline-{}", &digest[..16])
    }
}

fn parse_override(name: &str, raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|_| {
        PipelineError::Configuration(format!("{name} must be a positive integer, got {raw:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::requirement::Complexity;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"{
        "rounds": 5,
        "concurrency": 2,
        "complexity": "mixed",
        "systemModel": {"provider": "openai", "model": "gpt-sys"},
        "targetModel": {"provider": "anthropic", "model": "target-1", "temperature": 0.2},
        "judges": [
            {"provider": "openai", "model": "judge-a", "weight": 0.5},
            {"provider": "google", "model": "judge-b"}
        ],
        "sandbox": {"enabled": true}
    }"#;

    fn sample() -> PipelineConfig {
        PipelineConfig::from_json_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_parses_camel_case_with_defaults() {
        let config = sample();
        assert_eq!(config.rounds, 5);
        assert_eq!(config.complexity, ComplexitySetting::Mixed);
        assert_eq!(config.judges[1].weight, 1.0);
        assert!(config.sandbox.enabled);
        assert!(config.sandbox.strict, "strict defaults to true");
        assert_eq!(config.dimension_weights, DimensionWeights::default());
        assert_eq!(config.target_model.temperature, Some(0.2));
    }

    #[test]
    fn test_validate_rejects_zero_rounds_and_missing_judges() {
        let mut config = sample();
        config.rounds = 0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));

        let mut config = sample();
        config.judges.clear();
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut config = sample();
        config.dimension_weights = DimensionWeights(DimensionScores::default());
        assert!(config.validate().is_err());

        let mut config = sample();
        config.dimension_weights.0.security = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_and_reject_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ROUNDS, "9"),
            (ENV_CONCURRENCY, "4"),
            (ENV_SANDBOX_STRICT, "false"),
        ]);
        let mut config = sample();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.rounds, 9);
        assert_eq!(config.concurrency, 4);
        assert!(!config.sandbox.strict);

        let mut config = sample();
        let err = config
            .apply_overrides(|name| (name == ENV_CONCURRENCY).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_checkpoint_key_ignores_concurrency_but_not_rounds() {
        let base = sample();
        let mut more_workers = base.clone();
        more_workers.concurrency = 8;
        assert_eq!(base.checkpoint_key(), more_workers.checkpoint_key());

        let mut more_rounds = base.clone();
        more_rounds.rounds = 6;
        assert_ne!(base.checkpoint_key(), more_rounds.checkpoint_key());

        let mut fixed = base.clone();
        fixed.complexity = ComplexitySetting::Fixed(Complexity::C1);
        assert_ne!(base.checkpoint_key(), fixed.checkpoint_key());

        let key = base.checkpoint_key();
        assert!(key.starts_with("pipeline-"));
        assert_eq!(key.len(), "pipeline-".len() + 16);
    }

    #[test]
    fn test_distinct_judges_dedupes_by_id() {
        let mut config = sample();
        config.judges.push(JudgeConfig::new("openai", "judge-a"));
        let ids: Vec<String> = distinct_judges(&config.judges).iter().map(|j| j.id()).collect();
        assert_eq!(ids, vec!["openai/judge-a", "google/judge-b"]);
    }

    #[test]
    fn test_weighted_apply_matches_manual_sum() {
        let weights = DimensionWeights::default();
        let scores = DimensionScores {
            functional_completeness: 70.0,
            code_quality: 80.0,
            logic_accuracy: 80.0,
            security: 90.0,
            engineering_practice: 80.0,
        };
        assert!((weights.apply(&scores) - 78.0).abs() < 1e-9);
    }
}
