//! Document-build verifier: compiles a document and parses diagnostics.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, instrument};

use crate::core::types::{ArtifactKind, Finding, Severity};
use crate::io::process::run_with_timeout;
use crate::io::verifier::{VerificationResult, Verifier, VerifierError};

/// Per-class cap on parsed diagnostics, so a pathological log cannot flood
/// the findings list.
const MAX_PARSED: usize = 10;

/// Runs a configured compiler command (`latexmk`, `tectonic`, ...) against
/// the artifact and turns its log into findings: `! ...` error lines become
/// Major findings, `LaTeX Warning:` lines become Minor ones.
pub struct DocumentBuildVerifier {
    command: Vec<String>,
    output_limit_bytes: usize,
}

impl DocumentBuildVerifier {
    pub fn new(command: Vec<String>, output_limit_bytes: usize) -> Self {
        Self {
            command,
            output_limit_bytes,
        }
    }

    fn crash(&self, reason: impl Into<String>) -> VerifierError {
        VerifierError::Crash {
            name: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl Verifier for DocumentBuildVerifier {
    fn name(&self) -> &str {
        "document-build"
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

        let output = run_with_timeout(cmd, timeout, self.output_limit_bytes)
            .map_err(|err| self.crash(format!("{err:#}")))?;
        if output.timed_out {
            return Err(VerifierError::Timeout {
                name: self.name().to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }

        let mut findings = parse_build_log(&output.combined());
        if !output.status.success() && findings.iter().all(|f| f.severity < Severity::Major) {
            // Build failed but the log yielded nothing parseable; report the
            // failure itself so the score cannot pass on an unparsed log.
            findings.push(Finding::new(
                Severity::Major,
                "build",
                format!("build failed with exit status {:?}", output.status.code()),
            ));
        }

        debug!(
            exit_code = ?output.status.code(),
            finding_count = findings.len(),
            "document build verified"
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

fn parse_build_log(log: &str) -> Vec<Finding> {
    // `! message` is the TeX engine error format; latexmk passes it through.
    let error_re = Regex::new(r"(?m)^! (.+)$").expect("static regex");
    let warning_re = Regex::new(r"(?m)^LaTeX Warning: (.+)$").expect("static regex");

    let mut findings = Vec::new();
    for capture in error_re.captures_iter(log).take(MAX_PARSED) {
        findings.push(Finding::new(Severity::Major, "build", capture[1].trim()));
    }
    for capture in warning_re.captures_iter(log).take(MAX_PARSED) {
        findings.push(Finding::new(Severity::Minor, "build", capture[1].trim()));
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_errors_and_warnings_from_log() {
        let log = "\
This is pdfTeX\n\
! Undefined control sequence.\n\
l.12 \\badmacro\n\
LaTeX Warning: Reference `tab:results' on page 3 undefined.\n";
        let findings = parse_build_log(log);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::Major);
        assert!(findings[0].message.contains("Undefined control sequence"));
        assert_eq!(findings[1].severity, Severity::Minor);
        assert!(findings[1].message.contains("tab:results"));
    }

    #[test]
    fn caps_parsed_diagnostics() {
        let log = "! boom\n".repeat(50);
        assert_eq!(parse_build_log(&log).len(), MAX_PARSED);
    }

    #[test]
    fn failed_build_with_silent_log_yields_major_finding() {
        let temp = tempfile::tempdir().expect("tempdir");
        let artifact = temp.path().join("main.tex");
        std::fs::write(&artifact, "\\documentclass{article}").expect("write");

        // `sh -c 'exit 1'` ignores the appended artifact argument.
        let verifier = DocumentBuildVerifier::new(
            vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()],
            10_000,
        );
        let result = verifier
            .verify(&artifact, ArtifactKind::Document, Duration::from_secs(5))
            .expect("verify");
        assert!(!result.passed);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Major);
    }

    #[test]
    fn timeout_is_a_typed_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let artifact = temp.path().join("main.tex");
        std::fs::write(&artifact, "x").expect("write");

        let verifier = DocumentBuildVerifier::new(
            vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()],
            10_000,
        );
        let err = verifier
            .verify(&artifact, ArtifactKind::Document, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, VerifierError::Timeout { .. }));
    }

    #[test]
    fn missing_tool_is_a_crash() {
        let temp = tempfile::tempdir().expect("tempdir");
        let artifact = temp.path().join("main.tex");
        std::fs::write(&artifact, "x").expect("write");

        let verifier =
            DocumentBuildVerifier::new(vec!["definitely-not-a-real-tool".to_string()], 10_000);
        let err = verifier
            .verify(&artifact, ArtifactKind::Document, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, VerifierError::Crash { .. }));
    }
}
