//! Verifier contract: external checks with bounded execution.
//!
//! Verifiers are the only components allowed to spawn subprocesses. They must
//! not mutate the artifact, and they must always return a result or a typed
//! error within the caller's timeout; the scheduler converts those errors
//! into Critical findings so infrastructure failures never silently pass.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::types::{ArtifactKind, Finding, Severity};

/// Schema for tool-emitted findings reports (Draft 2020-12).
const FINDINGS_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/findings_report.schema.json"
));

/// Typed verifier failures. Anything else a tool does wrong (bad exit, ugly
/// output) is a *verification* outcome, reported through findings, not an
/// error.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
    #[error("verifier '{name}' crashed: {reason}")]
    Crash { name: String, reason: String },
}

/// Immutable outcome of one verifier invocation for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub verifier: String,
    /// Artifact reference only; the orchestrator never owns the content.
    pub artifact: String,
    pub passed: bool,
    pub findings: Vec<Finding>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

/// A pluggable external check.
pub trait Verifier {
    fn name(&self) -> &str;

    /// Run the check against `artifact` within `timeout`. Must not mutate
    /// the artifact and must not hang past the timeout.
    fn verify(
        &self,
        artifact: &Path,
        kind: ArtifactKind,
        timeout: Duration,
    ) -> Result<VerificationResult, VerifierError>;
}

/// Convert a verifier infrastructure failure into the Critical finding the
/// scheduler records. Deduction 100 forces a block on every track.
pub fn failure_finding(err: &VerifierError) -> Finding {
    Finding {
        severity: Severity::Critical,
        category: "verifier".to_string(),
        message: err.to_string(),
        deduction: Some(100),
        suggested_fix: Some(
            "fix the verifier toolchain (missing tool, crash, or timeout) and retry".to_string(),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct FindingsReport {
    findings: Vec<Finding>,
}

/// Load a tool-emitted findings report, validating it against the embedded
/// schema before trusting any of it.
pub fn load_findings_report(path: &Path) -> Result<Vec<Finding>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read report {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse report {}", path.display()))?;
    validate_report_schema(&value)
        .with_context(|| format!("validate report {}", path.display()))?;
    let report: FindingsReport = serde_json::from_value(value)
        .with_context(|| format!("deserialize report {}", path.display()))?;
    Ok(report.findings)
}

fn validate_report_schema(report: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(FINDINGS_SCHEMA).context("parse findings schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(report)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "findings report schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
