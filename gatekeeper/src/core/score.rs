//! Rubric scoring: a pure function from findings to a 0-100 score.
//!
//! The score is always recomputed from the findings of an attempt, never
//! stored as an independently writable field, so it can never drift from the
//! diagnostics that justify it.

use serde::{Deserialize, Serialize};

use crate::core::types::{Finding, Severity};

/// A quality score in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(u32);

impl Score {
    pub const MAX: Score = Score(100);

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Deduction table mapping severity to points off, supplied as configuration.
///
/// `unknown_deduction` applies to severities the table does not know; rubric
/// tables are externally supplied and may be incomplete, so unknowns score as
/// a minor-grade deduction instead of erroring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Rubric {
    pub critical: u32,
    pub major: u32,
    pub minor: u32,
    pub info: u32,
    pub unknown_deduction: u32,
}

impl Default for Rubric {
    fn default() -> Self {
        Self {
            critical: 100,
            major: 5,
            minor: 2,
            info: 0,
            unknown_deduction: 2,
        }
    }
}

impl Rubric {
    /// Points deducted for one finding. An explicit per-finding deduction
    /// wins over the severity table.
    pub fn deduction_for(&self, finding: &Finding) -> u32 {
        if let Some(explicit) = finding.deduction {
            return explicit;
        }
        match finding.severity {
            Severity::Critical => self.critical,
            Severity::Major => self.major,
            Severity::Minor => self.minor,
            Severity::Info => self.info,
            Severity::Unknown => self.unknown_deduction,
        }
    }

    /// Compute `clamp(100 - Σ deduction(f), 0, 100)`.
    ///
    /// Deterministic and order-independent: permuting `findings` yields the
    /// same score. No findings means a perfect score.
    pub fn score(&self, findings: &[Finding]) -> Score {
        let total: u32 = findings
            .iter()
            .map(|f| self.deduction_for(f))
            .fold(0u32, u32::saturating_add);
        Score(100u32.saturating_sub(total))
    }
}
