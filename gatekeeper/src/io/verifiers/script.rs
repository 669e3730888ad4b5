//! Script-execution verifier: runs a numeric script and collects findings.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::core::types::{ArtifactKind, Finding, Severity};
use crate::io::process::run_with_timeout;
use crate::io::verifier::{VerificationResult, Verifier, VerifierError, load_findings_report};

/// Runs a configured interpreter (`Rscript`, `julia`, ...) against the
/// artifact. A non-zero exit becomes a Critical finding carrying the stderr
/// tail; a sibling `<stem>.findings.json` report, when present, contributes
/// further findings after schema validation.
pub struct ScriptVerifier {
    command: Vec<String>,
    output_limit_bytes: usize,
}

impl ScriptVerifier {
    pub fn new(command: Vec<String>, output_limit_bytes: usize) -> Self {
        Self {
            command,
            output_limit_bytes,
        }
    }
}

impl Verifier for ScriptVerifier {
    fn name(&self) -> &str {
        "script-run"
    }

    #[instrument(skip_all, fields(artifact = %artifact.display()))]
    fn verify(
        &self,
        artifact: &Path,
        _kind: ArtifactKind,
        timeout: Duration,
    ) -> Result<VerificationResult, VerifierError> {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]).arg(artifact);
        if let Some(parent) = artifact.parent()
            && !parent.as_os_str().is_empty()
        {
            cmd.current_dir(parent);
        }

        let output = run_with_timeout(cmd, timeout, self.output_limit_bytes).map_err(|err| {
            VerifierError::Crash {
                name: self.name().to_string(),
                reason: format!("{err:#}"),
            }
        })?;
        if output.timed_out {
            return Err(VerifierError::Timeout {
                name: self.name().to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }

        let mut findings = Vec::new();
        if !output.status.success() {
            findings.push(Finding {
                severity: Severity::Critical,
                category: "execution".to_string(),
                message: format!(
                    "script exited with status {:?}",
                    output.status.code()
                ),
                deduction: None,
                suggested_fix: tail(&output.stderr, 500),
            });
        }

        let report_path = report_path_for(artifact);
        if report_path.exists() {
            match load_findings_report(&report_path) {
                Ok(reported) => findings.extend(reported),
                Err(err) => {
                    // A report the script wrote but the schema rejects is tool
                    // misbehavior, scored rather than swallowed.
                    warn!(err = %format!("{err:#}"), "invalid findings report");
                    findings.push(Finding::new(
                        Severity::Major,
                        "report",
                        format!("invalid findings report: {err:#}"),
                    ));
                }
            }
        }

        debug!(
            exit_code = ?output.status.code(),
            finding_count = findings.len(),
            "script run verified"
        );
        Ok(VerificationResult {
            verifier: self.name().to_string(),
            artifact: artifact.display().to_string(),
            passed: output.status.success(),
            findings,
            exit_code: output.status.code(),
            duration_ms: output.duration.as_millis() as u64,
        })
    }
}

/// `analysis/gmm.R` reports into `analysis/gmm.findings.json`.
fn report_path_for(artifact: &Path) -> PathBuf {
    artifact.with_extension("findings.json")
}

fn tail(text: &str, max_chars: usize) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = trimmed
        .char_indices()
        .rev()
        .nth(max_chars.saturating_sub(1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    Some(trimmed[start..].to_string())
}
