//! Shared deterministic types for the orchestrator core.
//!
//! These types define stable contracts between components. They carry no
//! external state and must remain deterministic across runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quality track a task runs on. Each track has its own gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Production,
    Exploration,
}

#[derive(Debug, Error)]
#[error("unrecognized track '{0}' (expected 'production' or 'exploration')")]
pub struct InvalidTrackError(pub String);

impl FromStr for Track {
    type Err = InvalidTrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Track::Production),
            "exploration" => Ok(Track::Exploration),
            other => Err(InvalidTrackError(other.to_string())),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Production => f.write_str("production"),
            Track::Exploration => f.write_str("exploration"),
        }
    }
}

/// Kind of artifact a task produces. Selects which verifiers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Document,
    NumericScript,
    Manuscript,
    ExplorationArtifact,
}

#[derive(Debug, Error)]
#[error(
    "unrecognized artifact kind '{0}' (expected 'document', 'numeric_script', 'manuscript', or 'exploration_artifact')"
)]
pub struct InvalidKindError(pub String);

impl FromStr for ArtifactKind {
    type Err = InvalidKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(ArtifactKind::Document),
            "numeric_script" => Ok(ArtifactKind::NumericScript),
            "manuscript" => Ok(ArtifactKind::Manuscript),
            "exploration_artifact" => Ok(ArtifactKind::ExplorationArtifact),
            other => Err(InvalidKindError(other.to_string())),
        }
    }
}

/// Finding severity, ordered from least to most severe.
///
/// Verifiers may report severities the rubric does not know (tools are
/// externally supplied); those deserialize to [`Severity::Unknown`] and score
/// with the rubric's fallback deduction rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Info,
    Minor,
    Major,
    Critical,
}

// Manual impl because `#[serde(other)]` requires the fallback variant to be
// last, but `Unknown` must stay first to keep the least-severe `Ord` position.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "info" => Severity::Info,
            "minor" => Severity::Minor,
            "major" => Severity::Major,
            "critical" => Severity::Critical,
            _ => Severity::Unknown,
        })
    }
}

/// A single diagnostic item produced by a verifier.
///
/// `deduction`, when set by the verifier, overrides the rubric table for this
/// finding. `suggested_fix` is surfaced verbatim in block reports so the
/// Execute collaborator always gets actionable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub deduction: Option<u32>,
    #[serde(default)]
    pub suggested_fix: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, category: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.to_string(),
            message: message.into(),
            deduction: None,
            suggested_fix: None,
        }
    }
}

/// Gate decision for one scored attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Pass,
    Block,
    Warn,
}
