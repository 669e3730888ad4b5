//! Fix-up and escalation reports for the Execute collaborator.
//!
//! Every block or escalation carries the full findings list with severity and
//! suggested-fix text; a bare pass/fail bit is never enough to act on.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::score::Score;
use crate::core::types::{Finding, GateDecision, Track};

const FIX_REPORT_TEMPLATE: &str = include_str!("templates/fix_report.md");

/// Inputs for one rendered report.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub task_id: String,
    pub artifact: String,
    pub track: Track,
    pub decision: GateDecision,
    pub score: Score,
    pub attempts: u32,
    pub max_attempts: u32,
    pub findings: Vec<Finding>,
}

/// Render the markdown report handed to the Execute collaborator.
pub fn render_fix_report(report: &FixReport) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("fix_report", FIX_REPORT_TEMPLATE)
        .context("fix report template should be valid")?;
    let template = env.get_template("fix_report")?;
    let decision = match report.decision {
        GateDecision::Pass => "pass",
        GateDecision::Block => "block",
        GateDecision::Warn => "warn",
    };
    let rendered = template.render(context! {
        task_id => report.task_id,
        artifact => report.artifact,
        track => report.track.to_string(),
        decision => decision,
        score => report.score.value(),
        attempts => report.attempts,
        max_attempts => report.max_attempts,
        findings => report.findings,
    })?;
    Ok(rendered)
}
