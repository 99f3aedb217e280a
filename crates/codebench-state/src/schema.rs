//! Persisted record types for pipeline checkpoints.
//!
//! Field names serialize in camelCase so checkpoint documents stay readable
//! by the dashboard tooling that consumes run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current checkpoint document schema version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// One of the five scored dimensions of an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DimensionKey {
    FunctionalCompleteness,
    CodeQuality,
    LogicAccuracy,
    Security,
    EngineeringPractice,
}

impl DimensionKey {
    /// All dimensions in canonical order.
    pub const ALL: [DimensionKey; 5] = [
        DimensionKey::FunctionalCompleteness,
        DimensionKey::CodeQuality,
        DimensionKey::LogicAccuracy,
        DimensionKey::Security,
        DimensionKey::EngineeringPractice,
    ];

    /// The camelCase wire name of the dimension.
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKey::FunctionalCompleteness => "functionalCompleteness",
            DimensionKey::CodeQuality => "codeQuality",
            DimensionKey::LogicAccuracy => "logicAccuracy",
            DimensionKey::Security => "security",
            DimensionKey::EngineeringPractice => "engineeringPractice",
        }
    }
}

impl std::fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value (0..100) for each of the five dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub functional_completeness: f64,
    pub code_quality: f64,
    pub logic_accuracy: f64,
    pub security: f64,
    pub engineering_practice: f64,
}

impl DimensionScores {
    /// Build scores by evaluating `f` for every dimension.
    pub fn from_fn(mut f: impl FnMut(DimensionKey) -> f64) -> Self {
        Self {
            functional_completeness: f(DimensionKey::FunctionalCompleteness),
            code_quality: f(DimensionKey::CodeQuality),
            logic_accuracy: f(DimensionKey::LogicAccuracy),
            security: f(DimensionKey::Security),
            engineering_practice: f(DimensionKey::EngineeringPractice),
        }
    }

    pub fn get(&self, key: DimensionKey) -> f64 {
        match key {
            DimensionKey::FunctionalCompleteness => self.functional_completeness,
            DimensionKey::CodeQuality => self.code_quality,
            DimensionKey::LogicAccuracy => self.logic_accuracy,
            DimensionKey::Security => self.security,
            DimensionKey::EngineeringPractice => self.engineering_practice,
        }
    }

    pub fn set(&mut self, key: DimensionKey, value: f64) {
        match key {
            DimensionKey::FunctionalCompleteness => self.functional_completeness = value,
            DimensionKey::CodeQuality => self.code_quality = value,
            DimensionKey::LogicAccuracy => self.logic_accuracy = value,
            DimensionKey::Security => self.security = value,
            DimensionKey::EngineeringPractice => self.engineering_practice = value,
        }
    }

    /// Unweighted mean of the five values.
    pub fn mean(&self) -> f64 {
        DimensionKey::ALL.iter().map(|k| self.get(*k)).sum::<f64>() / DimensionKey::ALL.len() as f64
    }
}

/// Persisted result of one finished round. `failure_reason` is set when the
/// round was a failed placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRoundSnapshot {
    pub index: usize,
    pub overall_score: f64,
    pub dimension_scores: DimensionScores,
    pub ija: f64,
    pub requirement_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_submission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Resumable snapshot of a partially completed run.
///
/// `total_rounds` must match the round count of the run that loads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCheckpoint {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub total_rounds: usize,
    pub completed_rounds: Vec<PipelineRoundSnapshot>,
}

impl PipelineCheckpoint {
    /// Create a checkpoint at the current schema version. Snapshots are kept
    /// sorted by round index.
    pub fn new(total_rounds: usize, mut completed_rounds: Vec<PipelineRoundSnapshot>) -> Self {
        completed_rounds.sort_by_key(|s| s.index);
        Self {
            version: CHECKPOINT_VERSION,
            created_at: Utc::now(),
            total_rounds,
            completed_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(index: usize) -> PipelineRoundSnapshot {
        PipelineRoundSnapshot {
            index,
            overall_score: 71.5,
            dimension_scores: DimensionScores::from_fn(|_| 70.0),
            ija: 0.92,
            requirement_title: format!("Task {index}"),
            requirement_text: None,
            code_submission: None,
            failure_reason: None,
        }
    }

    #[test]
    fn test_dimension_key_wire_names() {
        let json = serde_json::to_string(&DimensionKey::FunctionalCompleteness).unwrap();
        assert_eq!(json, "\"functionalCompleteness\"");
        for key in DimensionKey::ALL {
            let encoded = serde_json::to_value(key).unwrap();
            assert_eq!(encoded.as_str(), Some(key.as_str()));
        }
    }

    #[test]
    fn test_dimension_scores_get_set_mean() {
        let mut scores = DimensionScores::default();
        scores.set(DimensionKey::Security, 50.0);
        scores.set(DimensionKey::CodeQuality, 100.0);
        assert_eq!(scores.get(DimensionKey::Security), 50.0);
        assert_eq!(scores.mean(), 30.0);
    }

    #[test]
    fn test_checkpoint_sorts_snapshots_and_uses_current_version() {
        let checkpoint = PipelineCheckpoint::new(5, vec![snapshot(3), snapshot(0)]);
        assert_eq!(checkpoint.version, CHECKPOINT_VERSION);
        let indices: Vec<usize> = checkpoint.completed_rounds.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn test_checkpoint_json_is_camel_case() {
        let checkpoint = PipelineCheckpoint::new(2, vec![snapshot(1)]);
        let value = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(value["totalRounds"], 2);
        assert_eq!(value["completedRounds"][0]["requirementTitle"], "Task 1");
        assert!(value["completedRounds"][0].get("codeSubmission").is_none());
        assert!(value["completedRounds"][0].get("failureReason").is_none());
    }

    #[test]
    fn test_snapshot_without_failure_reason_still_parses() {
        let raw = r#"{"index":0,"overallScore":0.0,"dimensionScores":{"functionalCompleteness":0.0,"codeQuality":0.0,"logicAccuracy":0.0,"security":0.0,"engineeringPractice":0.0},"ija":0.0,"requirementTitle":"Round 1 (failed)"}"#;
        let snapshot: PipelineRoundSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.failure_reason, None);

        let mut failed = snapshot.clone();
        failed.failure_reason = Some("timed out".to_string());
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["failureReason"], "timed out");
    }
}
