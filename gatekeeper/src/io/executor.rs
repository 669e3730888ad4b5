//! Executor abstraction for the external Execute collaborator.
//!
//! The [`Executor`] trait decouples stage orchestration from whatever
//! actually edits the artifact (a human, an agent CLI, a make target). Tests
//! use scripted executors that record calls without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{ArtifactKind, Finding};
use crate::io::process::run_with_timeout;

/// Parameters for one Execute invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Working directory for the executor process.
    pub workdir: PathBuf,
    /// Artifact the collaborator is expected to edit.
    pub artifact: PathBuf,
    pub kind: ArtifactKind,
    /// Intended steps from the plan stage, read-only once execution starts.
    pub plan: Vec<String>,
    /// Findings (severity >= Major) that must be fixed on this attempt.
    /// Empty on the first attempt.
    pub required_fixes: Vec<Finding>,
    /// Rendered fix-up report for this attempt, when one was written.
    pub report_path: Option<PathBuf>,
    /// Maximum time to wait for the executor to complete.
    pub timeout: Duration,
    /// Truncate captured executor output beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Abstraction over Execute backends.
pub trait Executor {
    /// Perform (or delegate) the edit described by `request`.
    fn execute(&self, request: &ExecRequest) -> Result<()>;
}

/// Executor that spawns a configured command, handing it the artifact path
/// and, on retries, the fix-up report path.
///
/// An empty command selects manual mode: the orchestrator logs what is
/// expected and returns, assuming the artifact is edited out of band between
/// `advance` calls.
pub struct CommandExecutor {
    command: Vec<String>,
}

impl CommandExecutor {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Executor for CommandExecutor {
    #[instrument(skip_all, fields(artifact = %request.artifact.display()))]
    fn execute(&self, request: &ExecRequest) -> Result<()> {
        if self.command.is_empty() {
            info!(
                artifact = %request.artifact.display(),
                report = ?request.report_path.as_ref().map(|p| p.display().to_string()),
                "manual execute: edit the artifact, then advance again"
            );
            return Ok(());
        }

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..])
            .arg(&request.artifact)
            .current_dir(&request.workdir);
        if let Some(report) = &request.report_path {
            cmd.arg(report);
        }

        let output = run_with_timeout(cmd, request.timeout, request.output_limit_bytes)?;
        if output.timed_out {
            warn!(timeout_secs = request.timeout.as_secs(), "executor timed out");
            return Err(anyhow!(
                "executor timed out after {:?}",
                request.timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "executor failed");
            return Err(anyhow!(
                "executor failed with status {:?}: {}",
                output.status.code(),
                output.stderr.trim()
            ));
        }

        debug!("executor completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn request(workdir: &std::path::Path, artifact: PathBuf) -> ExecRequest {
        ExecRequest {
            workdir: workdir.to_path_buf(),
            artifact,
            kind: ArtifactKind::NumericScript,
            plan: Vec::new(),
            required_fixes: Vec::new(),
            report_path: None,
            timeout: Duration::from_secs(5),
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn empty_command_is_manual_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = CommandExecutor::new(Vec::new());
        executor
            .execute(&request(temp.path(), temp.path().join("model.R")))
            .expect("manual mode succeeds");
    }

    #[test]
    fn command_receives_artifact_argument() {
        let temp = tempfile::tempdir().expect("tempdir");
        let artifact = temp.path().join("model.R");
        fs::write(&artifact, "x <- 1").expect("write");

        // Touch a marker named after the artifact argument.
        let executor = CommandExecutor::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"touch "$0.touched""#.to_string(),
        ]);
        executor
            .execute(&request(temp.path(), artifact.clone()))
            .expect("execute");
        assert!(temp.path().join("model.R.touched").exists());
    }

    #[test]
    fn failing_command_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = CommandExecutor::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "exit 1".to_string(),
        ]);
        let err = executor
            .execute(&request(temp.path(), temp.path().join("model.R")))
            .unwrap_err();
        assert!(err.to_string().contains("executor failed"));
    }
}
