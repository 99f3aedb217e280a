use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use crate::domain::evaluation::DimensionKey;
use crate::domain::run::{RoundStatus, RunRecord};

/// Write the run record as pretty JSON.
pub fn write_run_record_json(path: &Path, record: &RunRecord) -> Result<()> {
    let content = serde_json::to_string_pretty(record).context("serialize run record")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a markdown summary of a run: headline numbers, per-dimension
/// aggregates, one row per round and any warnings.
pub fn render_run_summary_md(record: &RunRecord) -> String {
    let mut out = String::new();
    out.push_str("# Benchmark Summary\n\n");
    let _ = write!(
        out,
        "- target: `{}`\n- judges: {}\n- rounds: {} ({} failed, {} resumed)\n- overall: {:.1} (95% CI {:.1}..{:.1})\n- agreement: {} (mean IJA {:.3})\n- tokens: {}\n\n",
        record.target_model,
        record.judge_ids.join(", "),
        record.total_rounds,
        record.failed_rounds,
        record.resumed_rounds,
        record.overall_score,
        record.ci95[0],
        record.ci95[1],
        record.agreement_level,
        record.mean_ija,
        record.usage.total(),
    );

    out.push_str("## Dimensions\n\n| dimension | score |\n|---|---|\n");
    for key in DimensionKey::ALL {
        let _ = writeln!(out, "| {} | {:.1} |", key, record.dimension_scores.get(key));
    }
    out.push('\n');

    out.push_str("## Rounds\n\n| # | requirement | status | score | IJA |\n|---|---|---|---|---|\n");
    for round in &record.rounds {
        let status = match &round.status {
            RoundStatus::Completed => "completed",
            RoundStatus::Failed { .. } => "failed",
            RoundStatus::Resumed => "resumed",
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.1} | {:.3} |",
            round.index + 1,
            round.requirement_title.replace('|', "\\|"),
            status,
            round.overall_score,
            round.ija,
        );
    }

    if !record.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in &record.warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}

/// Write the markdown summary.
pub fn write_run_summary_md(path: &Path, record: &RunRecord) -> Result<()> {
    let md = render_run_summary_md(record);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
