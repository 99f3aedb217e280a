//! Execution, evaluation and scoring records.

use serde::{Deserialize, Serialize};

pub use codebench_state::{DimensionKey, DimensionScores};

/// Output of the execution phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub code: String,
    pub language: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
}

/// One surviving judge's scores for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub judge_id: String,
    pub dimensions: DimensionScores,
}

impl EvaluationResult {
    /// Unweighted mean of this judge's five dimensions.
    pub fn overall(&self) -> f64 {
        self.dimensions.mean()
    }
}

/// Agreement classification from a standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementLevel {
    High,
    Moderate,
    Low,
}

impl AgreementLevel {
    pub const HIGH_MAX_SIGMA: f64 = 8.0;
    pub const MODERATE_MAX_SIGMA: f64 = 15.0;

    /// High for σ ≤ 8, moderate for σ ≤ 15, low above.
    pub fn from_std_dev(sigma: f64) -> Self {
        if sigma <= Self::HIGH_MAX_SIGMA {
            AgreementLevel::High
        } else if sigma <= Self::MODERATE_MAX_SIGMA {
            AgreementLevel::Moderate
        } else {
            AgreementLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementLevel::High => "high",
            AgreementLevel::Moderate => "moderate",
            AgreementLevel::Low => "low",
        }
    }
}

impl std::fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated score for one round's panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub overall_score: f64,
    pub dimension_scores: DimensionScores,
    pub ci95: [f64; 2],
    pub agreement_level: AgreementLevel,
    pub warnings: Vec<String>,
    /// Number of judges that contributed.
    pub judge_count: usize,
    /// Whether the outlier trim was applied.
    pub trimmed: bool,
}

impl ScoreResult {
    /// Neutral result for an empty panel.
    pub fn neutral() -> Self {
        Self {
            overall_score: 0.0,
            dimension_scores: DimensionScores::default(),
            ci95: [0.0, 0.0],
            agreement_level: AgreementLevel::Low,
            warnings: Vec::new(),
            judge_count: 0,
            trimmed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_thresholds_are_inclusive() {
        assert_eq!(AgreementLevel::from_std_dev(0.0), AgreementLevel::High);
        assert_eq!(AgreementLevel::from_std_dev(8.0), AgreementLevel::High);
        assert_eq!(AgreementLevel::from_std_dev(8.01), AgreementLevel::Moderate);
        assert_eq!(AgreementLevel::from_std_dev(15.0), AgreementLevel::Moderate);
        assert_eq!(AgreementLevel::from_std_dev(15.5), AgreementLevel::Low);
    }

    #[test]
    fn test_evaluation_overall_is_unweighted_mean() {
        let result = EvaluationResult {
            judge_id: "a".to_string(),
            dimensions: DimensionScores {
                functional_completeness: 80.0,
                code_quality: 70.0,
                logic_accuracy: 90.0,
                security: 85.0,
                engineering_practice: 75.0,
            },
        };
        assert_eq!(result.overall(), 80.0);
    }

    #[test]
    fn test_agreement_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AgreementLevel::Moderate).unwrap(),
            "\"moderate\""
        );
    }
}
