//! Stage scheduler: drives one task through the quality-gated pipeline.
//!
//! Ordering discipline: every transition appends its session record *before*
//! the in-memory stage moves, so a persistence failure leaves the task where
//! it was and the log never diverges from the state machine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::gate::decide;
use crate::core::stage::{Stage, valid_transition};
use crate::core::task::{Task, TaskManifest};
use crate::core::types::{ArtifactKind, Finding, GateDecision, Track};
use crate::io::config::OrchestratorConfig;
use crate::io::executor::{ExecRequest, Executor};
use crate::io::layout::StorePaths;
use crate::io::session_log::{SessionRecord, SessionRecorder};
use crate::io::task_store::{artifact_sha256, generate_task_id, load_manifest, write_manifest};
use crate::io::verifier::{Verifier, failure_finding};
use crate::report::{FixReport, render_fix_report};

/// Typed scheduler misuse errors. The task's state is unaffected when these
/// are returned.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task '{task_id}' is not awaiting retry (stage is {stage})")]
    NotRetrying { task_id: String, stage: Stage },
    #[error("task '{task_id}' exceeded {max_attempts} attempts and was escalated")]
    MaxAttemptsExceeded { task_id: String, max_attempts: u32 },
}

/// Inputs for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub artifact: PathBuf,
    pub kind: ArtifactKind,
    pub track: Track,
    pub plan: Vec<String>,
}

/// Drives tasks through `Planned -> Executing -> Verifying -> Scored` and the
/// gate outcomes, one logical thread of control per task.
pub struct Scheduler {
    paths: StorePaths,
    config: OrchestratorConfig,
    recorder: SessionRecorder,
}

impl Scheduler {
    pub fn new(root: &Path, config: OrchestratorConfig) -> Self {
        let paths = StorePaths::new(root);
        let recorder = SessionRecorder::new(&paths.sessions_dir);
        Self {
            paths,
            config,
            recorder,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Create a task and record its initial stage.
    ///
    /// An empty plan skips the Plan stage for trivial tasks; the skip is
    /// written to the session log rather than happening silently.
    #[instrument(skip_all, fields(artifact = %new_task.artifact.display()))]
    pub fn start(&self, new_task: NewTask) -> Result<Task> {
        let sha = artifact_sha256(&new_task.artifact)?;
        let manifest = TaskManifest {
            id: generate_task_id(),
            kind: new_task.kind,
            track: new_task.track,
            artifact: new_task.artifact.display().to_string(),
            artifact_sha256: sha,
            plan: new_task.plan,
            created_at: Utc::now().to_rfc3339(),
        };
        write_manifest(&self.paths.manifest_path(&manifest.id), &manifest)?;

        let task = Task::new(manifest);
        let mut record = SessionRecord::new(task.id(), task.stage, 0);
        record.note = Some(if task.manifest.plan.is_empty() {
            "task created; plan skipped (trivial task)".to_string()
        } else {
            "task created".to_string()
        });
        self.recorder.append(&record)?;
        info!(task_id = %task.id(), stage = %task.stage, "task started");
        Ok(task)
    }

    /// Reconstruct a task by replaying its session history.
    pub fn load(&self, task_id: &str) -> Result<Task> {
        let manifest_path = self.paths.manifest_path(task_id);
        if !manifest_path.exists() {
            return Err(anyhow!("unknown task '{task_id}'"));
        }
        let manifest = load_manifest(&manifest_path)?;
        let mut task = Task::new(manifest);
        let history = self.recorder.history(task_id)?;
        if let Some(last) = history.last() {
            task.stage = last.stage;
            task.attempts = last.attempt;
            task.findings = last.findings.clone();
        }
        debug!(task_id = %task_id, stage = %task.stage, attempts = task.attempts, "task loaded");
        Ok(task)
    }

    /// Run the next stage's side effect and transition.
    ///
    /// Calling on a terminal task is a no-op that returns the current stage:
    /// no record is appended and no side effect re-executes.
    #[instrument(skip_all, fields(task_id = %task.id(), stage = %task.stage))]
    pub fn advance<E: Executor>(
        &self,
        task: &mut Task,
        executor: &E,
        verifiers: &[Box<dyn Verifier>],
    ) -> Result<Stage> {
        if task.stage.is_terminal() {
            debug!("advance on terminal task is a no-op");
            return Ok(task.stage);
        }
        match task.stage {
            Stage::Planned => self.advance_planned(task),
            Stage::Executing => self.advance_executing(task, executor),
            Stage::Verifying => self.advance_verifying(task, verifiers),
            Stage::Scored => self.advance_scored(task),
            Stage::Retrying => Ok(self.retry(task)?),
            Stage::Committed | Stage::Escalated | Stage::Abandoned => unreachable!(),
        }
    }

    /// Re-enter `Executing` after a block, consuming one attempt.
    ///
    /// Only valid from `Retrying`. Exhausted attempts escalate the task and
    /// surface as a typed error.
    pub fn retry(&self, task: &mut Task) -> Result<Stage, SchedulerError> {
        if task.stage != Stage::Retrying {
            return Err(SchedulerError::NotRetrying {
                task_id: task.id().to_string(),
                stage: task.stage,
            });
        }
        if task.attempts >= self.config.max_attempts {
            // Normally unreachable (blocks escalate before Retrying once the
            // cap is hit), but a hand-edited log could get here.
            let mut record = SessionRecord::new(task.id(), Stage::Escalated, task.attempts);
            record.note = Some("attempts exhausted".to_string());
            record.findings = task.findings.clone();
            self.append_and_move(task, record)
                .map_err(|err| SchedulerError::MaxAttemptsExceeded {
                    task_id: format!("{} (escalation unrecorded: {err:#})", task.id()),
                    max_attempts: self.config.max_attempts,
                })?;
            return Err(SchedulerError::MaxAttemptsExceeded {
                task_id: task.id().to_string(),
                max_attempts: self.config.max_attempts,
            });
        }
        let mut record = SessionRecord::new(task.id(), Stage::Executing, task.attempts + 1);
        record.note = Some(format!("retry {} of {}", task.attempts + 1, self.config.max_attempts));
        record.findings = task.required_fixes();
        self.append_and_move(task, record).map_err(|err| {
            // Persistence failures must not advance state; report them as the
            // caller-visible failure they are.
            warn!(err = %format!("{err:#}"), "retry record append failed");
            SchedulerError::NotRetrying {
                task_id: format!("{} (record append failed: {err:#})", task.id()),
                stage: Stage::Retrying,
            }
        })?;
        task.attempts += 1;
        Ok(task.stage)
    }

    /// Abandon a task at a stage boundary, recording the cause.
    ///
    /// No-op on terminal tasks.
    pub fn cancel(&self, task: &mut Task, cause: &str) -> Result<Stage> {
        if task.stage.is_terminal() {
            return Ok(task.stage);
        }
        let mut record = SessionRecord::new(task.id(), Stage::Abandoned, task.attempts);
        record.note = Some(format!("cancelled: {cause}"));
        self.append_and_move(task, record)?;
        info!(task_id = %task.id(), cause, "task abandoned");
        Ok(task.stage)
    }

    fn advance_planned(&self, task: &mut Task) -> Result<Stage> {
        let mut record = SessionRecord::new(task.id(), Stage::Executing, task.attempts);
        record.note = Some("plan accepted".to_string());
        self.append_and_move(task, record)?;
        Ok(task.stage)
    }

    fn advance_executing<E: Executor>(&self, task: &mut Task, executor: &E) -> Result<Stage> {
        let report_path = self.latest_report_path(task);
        let request = ExecRequest {
            workdir: self.paths.root.clone(),
            artifact: PathBuf::from(&task.manifest.artifact),
            kind: task.manifest.kind,
            plan: task.manifest.plan.clone(),
            required_fixes: task.required_fixes(),
            report_path,
            timeout: Duration::from_secs(self.config.executor_timeout_secs),
            output_limit_bytes: self.config.output_limit_bytes,
        };
        executor
            .execute(&request)
            .with_context(|| format!("execute task '{}'", task.id()))?;

        let record = SessionRecord::new(task.id(), Stage::Verifying, task.attempts);
        self.append_and_move(task, record)?;
        Ok(task.stage)
    }

    fn advance_verifying(&self, task: &mut Task, verifiers: &[Box<dyn Verifier>]) -> Result<Stage> {
        let artifact = PathBuf::from(&task.manifest.artifact);
        let timeout = Duration::from_secs(self.config.verifier_timeout_secs);
        let mut findings: Vec<Finding> = Vec::new();
        for verifier in verifiers {
            match verifier.verify(&artifact, task.manifest.kind, timeout) {
                Ok(result) => {
                    debug!(
                        verifier = result.verifier,
                        passed = result.passed,
                        finding_count = result.findings.len(),
                        "verifier finished"
                    );
                    findings.extend(result.findings);
                }
                Err(err) => {
                    // Infrastructure failures become blocking findings, never
                    // silent passes and never orchestrator crashes.
                    warn!(verifier = verifier.name(), err = %err, "verifier failed");
                    findings.push(failure_finding(&err));
                }
            }
        }

        let mut record = SessionRecord::new(task.id(), Stage::Scored, task.attempts);
        record.findings = findings.clone();
        self.append_and_move(task, record)?;
        task.findings = findings;
        Ok(task.stage)
    }

    fn advance_scored(&self, task: &mut Task) -> Result<Stage> {
        let score = self.config.rubric.score(&task.findings);
        let decision = decide(score, task.manifest.track, &self.config.thresholds);
        info!(
            task_id = %task.id(),
            score = score.value(),
            decision = ?decision,
            track = %task.manifest.track,
            "gate decision"
        );

        let (next, note) = match decision {
            GateDecision::Pass => (Stage::Committed, None),
            GateDecision::Warn => (
                Stage::Committed,
                Some("committed with warnings".to_string()),
            ),
            GateDecision::Block => {
                if task.attempts >= self.config.max_attempts {
                    (Stage::Escalated, Some("attempts exhausted".to_string()))
                } else {
                    (Stage::Retrying, None)
                }
            }
        };

        if decision == GateDecision::Block {
            // The report is the actionable payload for the next attempt (or
            // for the human handling an escalation); write it before the
            // transition is recorded.
            self.write_fix_report(task, decision)?;
        }

        let mut record = SessionRecord::new(task.id(), next, task.attempts);
        record.decision = Some(decision);
        record.score = Some(score);
        record.findings = task.findings.clone();
        record.note = note;
        self.append_and_move(task, record)?;
        Ok(task.stage)
    }

    fn append_and_move(&self, task: &mut Task, record: SessionRecord) -> Result<()> {
        if !valid_transition(task.stage, record.stage) {
            bail!(
                "illegal transition {} -> {} for task '{}'",
                task.stage,
                record.stage,
                task.id()
            );
        }
        self.recorder.append(&record)?;
        task.stage = record.stage;
        Ok(())
    }

    fn write_fix_report(&self, task: &Task, decision: GateDecision) -> Result<()> {
        let report = FixReport {
            task_id: task.id().to_string(),
            artifact: task.manifest.artifact.clone(),
            track: task.manifest.track,
            decision,
            score: self.config.rubric.score(&task.findings),
            attempts: task.attempts,
            max_attempts: self.config.max_attempts,
            findings: task.required_fixes(),
        };
        let rendered = render_fix_report(&report)?;
        let dir = self.paths.report_dir(task.id());
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(format!("attempt-{}.md", task.attempts + 1));
        fs::write(&path, rendered).with_context(|| format!("write report {}", path.display()))?;
        debug!(path = %path.display(), "fix report written");
        Ok(())
    }

    /// Report written when the current attempt was blocked, if any.
    fn latest_report_path(&self, task: &Task) -> Option<PathBuf> {
        if task.attempts == 0 {
            return None;
        }
        let path = self
            .paths
            .report_dir(task.id())
            .join(format!("attempt-{}.md", task.attempts));
        path.exists().then_some(path)
    }
}
