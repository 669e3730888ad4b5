//! Gate policy: pass/block/warn decisions from a score and a track.
//!
//! Thresholds are injected configuration, never process-wide globals, and
//! `decide` is a pure function: identical `(score, track)` inputs always
//! yield the same decision.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::score::Score;
use crate::core::types::{GateDecision, Track};

/// Gate boundaries for one track.
///
/// Scores below `block_below` block. When `warn_below` is set, scores in
/// `[block_below, warn_below)` commit with a warning. Everything else passes
/// cleanly; scores at or above the warn boundary are the "excellence" band,
/// which is informational and does not change the decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackThresholds {
    pub block_below: u32,
    #[serde(default)]
    pub warn_below: Option<u32>,
}

/// Per-track threshold table, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Thresholds {
    pub production: TrackThresholds,
    pub exploration: TrackThresholds,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            production: TrackThresholds {
                block_below: 80,
                warn_below: Some(90),
            },
            exploration: TrackThresholds {
                block_below: 60,
                warn_below: None,
            },
        }
    }
}

impl Thresholds {
    pub fn for_track(&self, track: Track) -> TrackThresholds {
        match track {
            Track::Production => self.production,
            Track::Exploration => self.exploration,
        }
    }

    /// Reject malformed tables before any stage runs.
    pub fn validate(&self) -> Result<()> {
        for (name, t) in [("production", self.production), ("exploration", self.exploration)] {
            if t.block_below > 100 {
                return Err(anyhow!("{name}.block_below must be <= 100"));
            }
            if let Some(warn) = t.warn_below {
                if warn > 100 {
                    return Err(anyhow!("{name}.warn_below must be <= 100"));
                }
                if warn < t.block_below {
                    return Err(anyhow!("{name}.warn_below must be >= {name}.block_below"));
                }
            }
        }
        Ok(())
    }
}

/// Decide whether `score` passes the gate on `track`.
pub fn decide(score: Score, track: Track, thresholds: &Thresholds) -> GateDecision {
    let t = thresholds.for_track(track);
    if score.value() < t.block_below {
        return GateDecision::Block;
    }
    if let Some(warn) = t.warn_below
        && score.value() < warn
    {
        return GateDecision::Warn;
    }
    GateDecision::Pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::score::Rubric;
    use crate::core::types::{Finding, Severity};

    fn score_of(value: u32) -> Score {
        // Scores are only constructible through the rubric; derive one from a
        // single explicit deduction.
        let finding = Finding {
            deduction: Some(100 - value),
            ..Finding::new(Severity::Major, "test", "synthetic")
        };
        Rubric::default().score(&[finding])
    }

    #[test]
    fn production_blocks_below_eighty() {
        let thresholds = Thresholds::default();
        assert_eq!(
            decide(score_of(75), Track::Production, &thresholds),
            GateDecision::Block
        );
        assert_eq!(
            decide(score_of(79), Track::Production, &thresholds),
            GateDecision::Block
        );
    }

    #[test]
    fn production_warns_in_eighty_to_eighty_nine() {
        let thresholds = Thresholds::default();
        assert_eq!(
            decide(score_of(80), Track::Production, &thresholds),
            GateDecision::Warn
        );
        assert_eq!(
            decide(score_of(89), Track::Production, &thresholds),
            GateDecision::Warn
        );
    }

    #[test]
    fn production_passes_at_ninety_without_warning() {
        let thresholds = Thresholds::default();
        assert_eq!(
            decide(score_of(90), Track::Production, &thresholds),
            GateDecision::Pass
        );
    }

    #[test]
    fn exploration_passes_at_sixty_and_blocks_below() {
        let thresholds = Thresholds::default();
        assert_eq!(
            decide(score_of(65), Track::Exploration, &thresholds),
            GateDecision::Pass
        );
        assert_eq!(
            decide(score_of(59), Track::Exploration, &thresholds),
            GateDecision::Block
        );
    }

    /// Zero findings score 100 and pass on every track. This boundary is a
    /// contract, not an incidental consequence.
    #[test]
    fn perfect_score_passes_on_both_tracks() {
        let thresholds = Thresholds::default();
        let perfect = Rubric::default().score(&[]);
        assert_eq!(
            decide(perfect, Track::Production, &thresholds),
            GateDecision::Pass
        );
        assert_eq!(
            decide(perfect, Track::Exploration, &thresholds),
            GateDecision::Pass
        );
    }

    #[test]
    fn decide_is_pure() {
        let thresholds = Thresholds::default();
        let first = decide(score_of(85), Track::Production, &thresholds);
        let second = decide(score_of(85), Track::Production, &thresholds);
        assert_eq!(first, second);
    }

    #[test]
    fn validate_rejects_warn_below_block() {
        let thresholds = Thresholds {
            production: TrackThresholds {
                block_below: 80,
                warn_below: Some(70),
            },
            ..Thresholds::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_boundaries() {
        let thresholds = Thresholds {
            exploration: TrackThresholds {
                block_below: 120,
                warn_below: None,
            },
            ..Thresholds::default()
        };
        assert!(thresholds.validate().is_err());
    }
}
