//! Scoring engine: aggregates per-judge dimension scores into a round score.
//!
//! Per dimension the judges' values are classified by σ. When the overall
//! agreement (mean of the five σ) is not low and at least three judges
//! contributed, the single lowest and highest value of each dimension, and of
//! the per-judge overall scores feeding the interval, are dropped before
//! averaging.

use crate::config::DimensionWeights;
use crate::domain::evaluation::{
    AgreementLevel, DimensionKey, DimensionScores, EvaluationResult, ScoreResult,
};
use crate::stats::{ci95_bounds, ci95_margin, mean, round1, std_dev, trim_extremes};

/// Minimum panel size for outlier trimming.
pub const MIN_JUDGES_FOR_TRIM: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: DimensionWeights,
}

impl ScoringEngine {
    pub fn new(weights: DimensionWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, results: &[EvaluationResult]) -> ScoreResult {
        if results.is_empty() {
            return ScoreResult::neutral();
        }

        let column = |key: DimensionKey| -> Vec<f64> {
            results.iter().map(|r| r.dimensions.get(key)).collect()
        };

        let mut warnings = Vec::new();
        let mut sigmas = Vec::with_capacity(DimensionKey::ALL.len());
        for key in DimensionKey::ALL {
            let sigma = std_dev(&column(key));
            if AgreementLevel::from_std_dev(sigma) == AgreementLevel::Low {
                warnings.push(format!(
                    "low inter-judge agreement on {key}: σ={sigma:.1}"
                ));
            }
            sigmas.push(sigma);
        }

        let agreement_level = AgreementLevel::from_std_dev(mean(&sigmas));
        let trimmed =
            agreement_level != AgreementLevel::Low && results.len() >= MIN_JUDGES_FOR_TRIM;
        let select = |values: Vec<f64>| -> Vec<f64> {
            if trimmed {
                trim_extremes(&values)
            } else {
                values
            }
        };

        let raw_dimensions = DimensionScores::from_fn(|key| mean(&select(column(key))));
        let raw_overall = self.weights.apply(&raw_dimensions);

        let judge_overall: Vec<f64> = results
            .iter()
            .map(|r| self.weights.apply(&r.dimensions))
            .collect();
        let margin = ci95_margin(&select(judge_overall));

        ScoreResult {
            overall_score: round1(raw_overall),
            dimension_scores: DimensionScores::from_fn(|key| round1(raw_dimensions.get(key))),
            ci95: ci95_bounds(raw_overall, margin),
            agreement_level,
            warnings,
            judge_count: results.len(),
            trimmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge(id: &str, values: [f64; 5]) -> EvaluationResult {
        EvaluationResult {
            judge_id: id.to_string(),
            dimensions: DimensionScores {
                functional_completeness: values[0],
                code_quality: values[1],
                logic_accuracy: values[2],
                security: values[3],
                engineering_practice: values[4],
            },
        }
    }

    #[test]
    fn test_two_judge_weighted_example() {
        let engine = ScoringEngine::new(DimensionWeights::default());
        let score = engine.score(&[
            judge("a", [80.0, 70.0, 90.0, 85.0, 75.0]),
            judge("b", [60.0, 90.0, 70.0, 95.0, 85.0]),
        ]);
        assert_eq!(score.dimension_scores.functional_completeness, 70.0);
        assert_eq!(score.overall_score, 78.0);
        assert!(score.ci95[0] <= 78.0 && 78.0 <= score.ci95[1]);
        assert_eq!(score.agreement_level, AgreementLevel::Moderate);
        assert!(!score.trimmed);
        assert!(score.warnings.is_empty());
    }

    #[test]
    fn test_trims_outlier_with_three_agreeing_judges() {
        let engine = ScoringEngine::default();
        let score = engine.score(&[
            judge("a", [70.0; 5]),
            judge("b", [72.0; 5]),
            judge("c", [90.0; 5]),
        ]);
        // σ ≈ 8.99 per dimension: moderate, so trimming applies and only
        // the middle value survives.
        assert!(score.trimmed);
        assert_eq!(score.agreement_level, AgreementLevel::Moderate);
        assert_eq!(score.dimension_scores.security, 72.0);
        assert_eq!(score.overall_score, 72.0);
        assert_eq!(score.ci95, [72.0, 72.0]);
    }

    #[test]
    fn test_no_trim_below_three_judges() {
        let engine = ScoringEngine::default();
        let score = engine.score(&[judge("a", [70.0; 5]), judge("b", [74.0; 5])]);
        assert!(!score.trimmed);
        assert_eq!(score.dimension_scores.code_quality, 72.0);
    }

    #[test]
    fn test_no_trim_when_agreement_is_low() {
        let engine = ScoringEngine::default();
        let score = engine.score(&[
            judge("a", [10.0; 5]),
            judge("b", [50.0; 5]),
            judge("c", [95.0; 5]),
        ]);
        assert_eq!(score.agreement_level, AgreementLevel::Low);
        assert!(!score.trimmed);
        assert_eq!(score.dimension_scores.logic_accuracy, 51.7);
        assert_eq!(score.warnings.len(), 5);
        assert!(score.warnings[0].contains("functionalCompleteness"));
    }

    #[test]
    fn test_single_low_dimension_warns_once() {
        let engine = ScoringEngine::default();
        let score = engine.score(&[
            judge("a", [80.0, 80.0, 80.0, 20.0, 80.0]),
            judge("b", [80.0, 80.0, 80.0, 90.0, 80.0]),
        ]);
        assert_eq!(score.warnings.len(), 1);
        assert!(score.warnings[0].contains("security"));
        assert!(score.warnings[0].contains("σ=35.0"));
    }

    #[test]
    fn test_zero_judges_is_neutral() {
        let score = ScoringEngine::default().score(&[]);
        assert_eq!(score, ScoreResult::neutral());
        assert_eq!(score.agreement_level, AgreementLevel::Low);
    }

    #[test]
    fn test_single_judge_has_zero_margin() {
        let score = ScoringEngine::default().score(&[judge("a", [64.0; 5])]);
        assert_eq!(score.overall_score, 64.0);
        assert_eq!(score.ci95, [64.0, 64.0]);
        assert_eq!(score.agreement_level, AgreementLevel::High);
    }
}
