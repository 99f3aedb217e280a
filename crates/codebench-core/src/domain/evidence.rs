//! Evidence chain records: how a run's score was produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::run::Phase;

/// One phase of the run-level timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseEvent {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PhaseEvent {
    pub fn new(phase: Phase, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            phase,
            started_at,
            completed_at,
            duration_ms,
        }
    }
}

/// A representative input/output pair from one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSample {
    pub round_index: Option<usize>,
    pub input: String,
    pub output: String,
}

/// Models and settings the run executed with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceEnvironment {
    pub target_model: Option<String>,
    pub system_model: Option<String>,
    pub judge_models: Vec<String>,
    pub concurrency: Option<usize>,
    pub rounds: Option<usize>,
    pub runner_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceChain {
    pub timeline: Vec<PhaseEvent>,
    pub samples: Vec<EvidenceSample>,
    pub environment: EvidenceEnvironment,
}
