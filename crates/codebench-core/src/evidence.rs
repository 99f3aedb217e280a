//! Evidence chain assembly.
//!
//! [`EvidenceChainBuilder`] only assembles; it never reorders or corrects
//! the timeline it is given. Run aggregation derives the timeline from the
//! rounds with [`timeline_from_rounds`] and applies [`clamp_monotonic`]
//! before handing it over.

use chrono::{DateTime, Utc};

use crate::domain::evidence::{EvidenceChain, EvidenceEnvironment, EvidenceSample, PhaseEvent};
use crate::domain::run::{Phase, RoundResult};

/// Longest excerpt kept in a sample, in characters.
pub const SAMPLE_EXCERPT_CHARS: usize = 400;
/// Samples kept per run.
pub const MAX_SAMPLES: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct EvidenceChainBuilder {
    timeline: Option<Vec<PhaseEvent>>,
    samples: Option<Vec<EvidenceSample>>,
    environment: EvidenceEnvironment,
}

impl EvidenceChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeline(mut self, timeline: Vec<PhaseEvent>) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn samples(mut self, samples: Vec<EvidenceSample>) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn judge_models(mut self, judge_models: Vec<String>) -> Self {
        self.environment.judge_models = judge_models;
        self
    }

    /// Replace the environment. Judge models set earlier are kept when the
    /// new environment lists none.
    pub fn environment(mut self, mut environment: EvidenceEnvironment) -> Self {
        if environment.judge_models.is_empty() {
            environment.judge_models = std::mem::take(&mut self.environment.judge_models);
        }
        self.environment = environment;
        self
    }

    /// Assemble the chain. Missing parts are synthesized: a four-phase
    /// timeline sharing the window `[at, at]` and one placeholder sample.
    pub fn build(self, at: DateTime<Utc>) -> EvidenceChain {
        let timeline = self.timeline.unwrap_or_else(|| {
            Phase::TIMELINE
                .iter()
                .map(|phase| PhaseEvent::new(*phase, at, at))
                .collect()
        });
        let samples = self.samples.unwrap_or_else(|| {
            vec![EvidenceSample {
                round_index: None,
                input: "(no input recorded)".to_string(),
                output: "(no output recorded)".to_string(),
            }]
        });
        let mut environment = self.environment;
        if environment.runner_version.is_empty() {
            environment.runner_version = crate::VERSION.to_string();
        }
        EvidenceChain {
            timeline,
            samples,
            environment,
        }
    }
}

/// Run-level timeline: for each phase, the earliest start and latest end
/// seen across `rounds`. Phases no round reached fall back to
/// `[fallback_start, fallback_end]`.
pub fn timeline_from_rounds(
    rounds: &[RoundResult],
    fallback_start: DateTime<Utc>,
    fallback_end: DateTime<Utc>,
) -> Vec<PhaseEvent> {
    Phase::TIMELINE
        .iter()
        .map(|phase| {
            let windows = rounds.iter().filter_map(|r| r.timeline.get(*phase));
            let (start, end) = windows.fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, w| {
                Some(match acc {
                    None => (w.started_at, w.completed_at),
                    Some((s, e)) => (s.min(w.started_at), e.max(w.completed_at)),
                })
            })
            .unwrap_or((fallback_start, fallback_end));
            PhaseEvent::new(*phase, start, end)
        })
        .collect()
}

/// Enforce `start ≤ completed` per phase and `start ≥ previous completed`
/// across phases by clamping forward. Order is preserved.
pub fn clamp_monotonic(events: Vec<PhaseEvent>) -> Vec<PhaseEvent> {
    let mut floor: Option<DateTime<Utc>> = None;
    events
        .into_iter()
        .map(|event| {
            let started_at = match floor {
                Some(prev) if event.started_at < prev => prev,
                _ => event.started_at,
            };
            let completed_at = event.completed_at.max(started_at);
            floor = Some(completed_at);
            PhaseEvent::new(event.phase, started_at, completed_at)
        })
        .collect()
}

/// Up to [`MAX_SAMPLES`] samples from the lowest-indexed rounds that
/// produced code.
pub fn samples_from_rounds(rounds: &[RoundResult]) -> Vec<EvidenceSample> {
    let mut with_code: Vec<&RoundResult> = rounds
        .iter()
        .filter(|r| r.code_submission.is_some())
        .collect();
    with_code.sort_by_key(|r| r.index);
    with_code
        .into_iter()
        .take(MAX_SAMPLES)
        .map(|r| EvidenceSample {
            round_index: Some(r.index),
            input: excerpt(
                r.requirement_text
                    .as_deref()
                    .unwrap_or(&r.requirement_title),
            ),
            output: excerpt(r.code_submission.as_deref().unwrap_or_default()),
        })
        .collect()
}

/// First [`SAMPLE_EXCERPT_CHARS`] characters of `text`, with an ellipsis
/// when cut.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(SAMPLE_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{PhaseWindow, RoundTimeline, TokenUsage};
    use chrono::Duration;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn assert_monotonic(events: &[PhaseEvent]) {
        for pair in events.windows(2) {
            assert!(pair[0].completed_at <= pair[1].started_at);
        }
        for event in events {
            assert!(event.started_at <= event.completed_at);
        }
    }

    #[test]
    fn test_default_chain_has_four_phases_and_placeholder_sample() {
        let chain = EvidenceChainBuilder::new()
            .judge_models(vec!["openai/j1".to_string()])
            .build(t(0));
        let phases: Vec<Phase> = chain.timeline.iter().map(|e| e.phase).collect();
        assert_eq!(phases, Phase::TIMELINE.to_vec());
        assert!(chain.timeline.iter().all(|e| e.started_at == t(0) && e.completed_at == t(0)));
        assert_eq!(chain.samples.len(), 1);
        assert_eq!(chain.environment.judge_models, vec!["openai/j1"]);
        assert_eq!(chain.environment.runner_version, crate::VERSION);
    }

    #[test]
    fn test_builder_does_not_reorder_supplied_timeline() {
        let supplied = vec![
            PhaseEvent::new(Phase::Score, t(9), t(10)),
            PhaseEvent::new(Phase::Generate, t(0), t(1)),
        ];
        let chain = EvidenceChainBuilder::new()
            .timeline(supplied.clone())
            .build(t(20));
        assert_eq!(chain.timeline, supplied);
    }

    #[test]
    fn test_clamp_pushes_overlapping_phases_forward() {
        let events = vec![
            PhaseEvent::new(Phase::Generate, t(0), t(10)),
            PhaseEvent::new(Phase::Execute, t(5), t(8)),
            PhaseEvent::new(Phase::Evaluate, t(12), t(11)),
            PhaseEvent::new(Phase::Score, t(3), t(20)),
        ];
        let clamped = clamp_monotonic(events);
        assert_monotonic(&clamped);
        assert_eq!(clamped[1].started_at, t(10));
        assert_eq!(clamped[1].completed_at, t(10));
        assert_eq!(clamped[2].started_at, t(12));
        assert_eq!(clamped[2].completed_at, t(12));
        assert_eq!(clamped[3].started_at, t(12));
        assert_eq!(clamped[3].duration_ms, 8_000);
    }

    #[test]
    fn test_timeline_from_rounds_uses_min_start_max_end() {
        let mut a = RoundTimeline::default();
        a.set(Phase::Generate, PhaseWindow::new(t(0), t(2)));
        a.set(Phase::Execute, PhaseWindow::new(t(2), t(5)));
        let mut b = RoundTimeline::default();
        b.set(Phase::Generate, PhaseWindow::new(t(1), t(3)));
        let rounds: Vec<RoundResult> = [a, b]
            .into_iter()
            .enumerate()
            .map(|(i, timeline)| {
                RoundResult::failed_placeholder(
                    i,
                    None,
                    "x".to_string(),
                    timeline,
                    TokenUsage::default(),
                )
            })
            .collect();

        let events = timeline_from_rounds(&rounds, t(0), t(30));
        assert_eq!(events[0].started_at, t(0));
        assert_eq!(events[0].completed_at, t(3));
        assert_eq!(events[1].completed_at, t(5));
        // evaluate never ran
        assert_eq!(events[2].started_at, t(0));
        assert_eq!(events[2].completed_at, t(30));

        assert_monotonic(&clamp_monotonic(events));
    }

    #[test]
    fn test_excerpt_cuts_on_char_boundary() {
        let long = "é".repeat(SAMPLE_EXCERPT_CHARS + 10);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), SAMPLE_EXCERPT_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_samples_prefer_lowest_rounds_with_code() {
        let make = |index: usize, code: Option<&str>| {
            let mut r = RoundResult::failed_placeholder(
                index,
                Some("t"),
                "x".to_string(),
                RoundTimeline::backfilled(t(0) + Duration::seconds(index as i64)),
                TokenUsage::default(),
            );
            r.code_submission = code.map(str::to_string);
            r
        };
        let rounds = vec![
            make(4, Some("d")),
            make(0, None),
            make(2, Some("b")),
            make(1, Some("a")),
            make(3, Some("c")),
        ];
        let samples = samples_from_rounds(&rounds);
        let indices: Vec<Option<usize>> = samples.iter().map(|s| s.round_index).collect();
        assert_eq!(indices, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(samples[0].output, "a");
    }
}
