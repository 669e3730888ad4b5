//! Scripted fakes and fixtures shared by unit and integration tests.
//!
//! Enabled for this crate's own tests and, via the `test-support` feature,
//! for the integration tests in `tests/`.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{ArtifactKind, Finding, Severity};
use crate::io::config::OrchestratorConfig;
use crate::io::executor::{ExecRequest, Executor};
use crate::io::layout::init_store;
use crate::io::verifier::{VerificationResult, Verifier, VerifierError};
use crate::scheduler::Scheduler;

/// Executor fake that records every request and fails on demand.
#[derive(Default)]
pub struct ScriptedExecutor {
    calls: Mutex<Vec<ExecRequest>>,
    failures: Mutex<VecDeque<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `execute` call with `message`, then succeeds.
    pub fn failing_once(message: &str) -> Self {
        let executor = Self::default();
        executor
            .failures
            .lock()
            .expect("lock")
            .push_back(message.to_string());
        executor
    }

    pub fn calls(&self) -> Vec<ExecRequest> {
        self.calls.lock().expect("lock").clone()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, request: &ExecRequest) -> Result<()> {
        self.calls.lock().expect("lock").push(request.clone());
        if let Some(message) = self.failures.lock().expect("lock").pop_front() {
            return Err(anyhow!(message));
        }
        Ok(())
    }
}

/// One scripted verification outcome.
pub enum ScriptedVerify {
    Findings(Vec<Finding>),
    Fail(VerifierError),
}

/// Verifier fake that pops one scripted outcome per call; once the script is
/// exhausted every further call reports no findings.
pub struct ScriptedVerifier {
    name: String,
    outcomes: Mutex<VecDeque<ScriptedVerify>>,
}

impl ScriptedVerifier {
    pub fn new(name: &str, outcomes: Vec<ScriptedVerify>) -> Self {
        Self {
            name: name.to_string(),
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    pub fn clean(name: &str) -> Self {
        Self::new(name, Vec::new())
    }

    /// Box a single scripted verifier for `Scheduler::advance`.
    pub fn boxed(self) -> Vec<Box<dyn Verifier>> {
        vec![Box::new(self)]
    }
}

impl Verifier for ScriptedVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn verify(
        &self,
        artifact: &std::path::Path,
        _kind: ArtifactKind,
        _timeout: Duration,
    ) -> Result<VerificationResult, VerifierError> {
        let outcome = self
            .outcomes
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(ScriptedVerify::Findings(Vec::new()));
        match outcome {
            ScriptedVerify::Fail(err) => Err(err),
            ScriptedVerify::Findings(findings) => Ok(VerificationResult {
                verifier: self.name.clone(),
                artifact: artifact.display().to_string(),
                passed: findings.iter().all(|f| f.severity < Severity::Major),
                findings,
                exit_code: Some(0),
                duration_ms: 1,
            }),
        }
    }
}

/// Temp workspace with an initialized store layout.
pub struct TestStore {
    pub root: PathBuf,
    _temp: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().to_path_buf();
        init_store(&root, false).expect("init store");
        Self { root, _temp: temp }
    }

    pub fn config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default();
        config.verifier_timeout_secs = 5;
        config.executor_timeout_secs = 5;
        config
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(&self.root, self.config())
    }

    pub fn scheduler_with(&self, config: OrchestratorConfig) -> Scheduler {
        Scheduler::new(&self.root, config)
    }

    pub fn write_artifact(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create artifact dir");
        }
        fs::write(&path, contents).expect("write artifact");
        path
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Finding with the rubric's table deduction.
pub fn finding(severity: Severity, category: &str) -> Finding {
    Finding::new(severity, category, format!("{category} issue"))
}

/// Finding with an explicit deduction override.
pub fn deduction_finding(severity: Severity, points: u32) -> Finding {
    Finding {
        deduction: Some(points),
        ..Finding::new(severity, "stats", "scripted finding")
    }
}
