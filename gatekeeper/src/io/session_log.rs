//! Append-only session recorder under `.gatekeeper/sessions/`.
//!
//! One line-delimited JSON file per task: each stage transition appends
//! exactly one record, and the interface offers no update or delete. The log
//! is the durable source of truth for resuming a task after restart; the
//! scheduler replays it to reconstruct stage and attempt state.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::score::Score;
use crate::core::stage::Stage;
use crate::core::types::{Finding, GateDecision};

/// One audit record, created at every stage transition and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub task_id: String,
    /// Stage the task entered with this transition.
    pub stage: Stage,
    /// Gate decision, present only on transitions out of `Scored`.
    #[serde(default)]
    pub decision: Option<GateDecision>,
    /// Score, present only on transitions out of `Scored`. Recomputed from
    /// findings at decision time; stored here purely as an audit snapshot.
    #[serde(default)]
    pub score: Option<Score>,
    /// Retries consumed when this record was written.
    pub attempt: u32,
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Free-form annotation ("plan skipped", "committed with warnings",
    /// cancellation cause, ...).
    #[serde(default)]
    pub note: Option<String>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl SessionRecord {
    pub fn new(task_id: &str, stage: Stage, attempt: u32) -> Self {
        Self {
            task_id: task_id.to_string(),
            stage,
            decision: None,
            score: None,
            attempt,
            findings: Vec::new(),
            note: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Durable append-only store, one JSONL file per task id.
///
/// Per-task files keep writers serialized per task while staying concurrent
/// across distinct tasks; each record is a single `write_all` of one line, so
/// readers never observe a partial record.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    sessions_dir: PathBuf,
}

impl SessionRecorder {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    fn path_for(&self, task_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{task_id}.jsonl"))
    }

    /// Append one record durably. The scheduler must not advance state when
    /// this fails; the log and the state machine are never allowed to
    /// diverge.
    pub fn append(&self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.sessions_dir)
            .with_context(|| format!("create {}", self.sessions_dir.display()))?;
        let path = self.path_for(&record.task_id);
        let mut line = serde_json::to_string(record).context("serialize session record")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open session log {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append session log {}", path.display()))?;
        file.sync_data()
            .with_context(|| format!("sync session log {}", path.display()))?;
        debug!(task_id = %record.task_id, stage = %record.stage, "session record appended");
        Ok(())
    }

    /// Read the full history for a task, in append order. A task with no log
    /// yet has an empty history.
    pub fn history(&self, task_id: &str) -> Result<Vec<SessionRecord>> {
        let path = self.path_for(task_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_records(&path)
    }
}

fn read_records(path: &Path) -> Result<Vec<SessionRecord>> {
    let file =
        fs::File::open(path).with_context(|| format!("open session log {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read session log {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SessionRecord = serde_json::from_str(&line)
            .with_context(|| format!("parse {} line {}", path.display(), idx + 1))?;
        records.push(record);
    }
    Ok(records)
}
