//! Evaluation phase: judge panel, judge prompt/response handling and
//! inter-judge agreement.

pub mod judge;
pub mod panel;

pub use judge::{build_judge_messages, parse_judge_scores};
pub use panel::{
    calculate_ija, EvaluationPanel, JudgeRoster, PanelOutcome, PanelOutcomeWithIja,
    IJA_SIGMA_CEILING,
};
