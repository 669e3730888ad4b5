//! Stage machine for task lifecycle.
//!
//! Stages form an explicit transition table rather than implicit policy:
//! every move the scheduler makes must be listed here, and the table is what
//! replay validates against when resuming a task from its session history.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planned,
    Executing,
    Verifying,
    Scored,
    Committed,
    Retrying,
    Escalated,
    Abandoned,
}

impl Stage {
    /// Terminal stages admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Committed | Stage::Escalated | Stage::Abandoned)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Planned => "planned",
            Stage::Executing => "executing",
            Stage::Verifying => "verifying",
            Stage::Scored => "scored",
            Stage::Committed => "committed",
            Stage::Retrying => "retrying",
            Stage::Escalated => "escalated",
            Stage::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Whether `from -> to` is a legal scheduler transition.
///
/// Any non-terminal stage may move to `Abandoned` (cooperative cancellation
/// at stage boundaries). Everything else follows the pipeline order, with
/// `Retrying -> Executing` re-entering after a block and `Scored` fanning out
/// to the gate outcomes.
pub fn valid_transition(from: Stage, to: Stage) -> bool {
    if from.is_terminal() {
        return false;
    }
    if to == Stage::Abandoned {
        return true;
    }
    matches!(
        (from, to),
        (Stage::Planned, Stage::Executing)
            | (Stage::Executing, Stage::Verifying)
            | (Stage::Verifying, Stage::Scored)
            | (Stage::Scored, Stage::Committed)
            | (Stage::Scored, Stage::Retrying)
            | (Stage::Scored, Stage::Escalated)
            | (Stage::Retrying, Stage::Executing)
            | (Stage::Retrying, Stage::Escalated)
    )
}
