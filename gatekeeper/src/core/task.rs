//! Task model: immutable manifest plus replay-derived runtime state.

use serde::{Deserialize, Serialize};

use crate::core::stage::Stage;
use crate::core::types::{ArtifactKind, Finding, Severity, Track};

/// Immutable description of a task, written once at `start`.
///
/// The manifest never changes after creation; everything that evolves over
/// the task's lifetime (stage, attempts, findings) lives in the append-only
/// session log and is reconstructed by replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskManifest {
    /// Unique task id, e.g. `task-20250612-143501-x2k9qa`.
    pub id: String,
    pub kind: ArtifactKind,
    pub track: Track,
    /// Path to the artifact. The orchestrator holds the reference only,
    /// never the content.
    pub artifact: String,
    /// SHA-256 of the artifact at creation, for later baseline comparison.
    pub artifact_sha256: String,
    /// Intended steps, in order. Empty means the plan stage was skipped for
    /// a trivial task; the skip is recorded in the session log, not silent.
    pub plan: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl TaskManifest {
    /// Stage a fresh task starts in: `Planned`, or `Executing` when there is
    /// no plan to review.
    pub fn initial_stage(&self) -> Stage {
        if self.plan.is_empty() {
            Stage::Executing
        } else {
            Stage::Planned
        }
    }
}

/// In-memory task state, owned by the scheduler for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub manifest: TaskManifest,
    pub stage: Stage,
    /// Retries consumed so far. Entering `Retrying` does not consume one;
    /// re-entering `Executing` does.
    pub attempts: u32,
    /// Findings from the most recent verification, pending scoring or
    /// fix-up. Recomputed from the session log on resume.
    pub findings: Vec<Finding>,
}

impl Task {
    pub fn new(manifest: TaskManifest) -> Self {
        let stage = manifest.initial_stage();
        Self {
            manifest,
            stage,
            attempts: 0,
            findings: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Findings that must be fixed before the next attempt (severity at or
    /// above Major). This is the fix-up input handed to the Execute
    /// collaborator after a block.
    pub fn required_fixes(&self) -> Vec<Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity >= Severity::Major)
            .cloned()
            .collect()
    }
}
