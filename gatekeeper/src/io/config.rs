//! Orchestrator configuration stored under `.gatekeeper/config.toml`.
//!
//! Loaded once at process start; reload requires restart. Validation failures
//! are fatal before any stage runs, so a bad table can never partially apply.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::gate::Thresholds;
use crate::core::score::Rubric;
use crate::core::types::ArtifactKind;

/// Orchestrator configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Retries a task may consume before a further block escalates.
    pub max_attempts: u32,

    /// Hard wall-clock cap per verifier invocation, in seconds.
    pub verifier_timeout_secs: u64,

    /// Hard wall-clock cap per executor invocation, in seconds.
    pub executor_timeout_secs: u64,

    /// Truncate captured child stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Severity -> deduction table for the rubric scorer.
    pub rubric: Rubric,

    /// Per-track gate boundaries.
    pub thresholds: Thresholds,

    pub verifiers: VerifierCommands,

    pub executor: ExecutorConfig,
}

/// Commands the concrete verifiers spawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifierCommands {
    /// Document compiler, invoked with the artifact path appended
    /// (e.g. `["latexmk", "-pdf", "-interaction=nonstopmode"]`).
    pub document: Vec<String>,
    /// Script interpreter, invoked with the artifact path appended
    /// (e.g. `["Rscript"]` or `["julia"]`).
    pub script: Vec<String>,
}

impl Default for VerifierCommands {
    fn default() -> Self {
        Self {
            document: vec![
                "latexmk".to_string(),
                "-pdf".to_string(),
                "-interaction=nonstopmode".to_string(),
            ],
            script: vec!["Rscript".to_string()],
        }
    }
}

/// External Execute collaborator invocation.
///
/// An empty command means manual mode: the orchestrator writes the fix-up
/// report and expects the artifact to be edited out of band between
/// `advance` calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorConfig {
    pub command: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            verifier_timeout_secs: 10 * 60,
            executor_timeout_secs: 30 * 60,
            output_limit_bytes: 100_000,
            rubric: Rubric::default(),
            thresholds: Thresholds::default(),
            verifiers: VerifierCommands::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.verifier_timeout_secs == 0 {
            return Err(anyhow!("verifier_timeout_secs must be > 0"));
        }
        if self.executor_timeout_secs == 0 {
            return Err(anyhow!("executor_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        for (name, command) in [
            ("verifiers.document", &self.verifiers.document),
            ("verifiers.script", &self.verifiers.script),
        ] {
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(anyhow!("{name} must be a non-empty array"));
            }
        }
        self.thresholds.validate()?;
        Ok(())
    }

    /// Verifier command for an artifact kind. Manuscripts build like
    /// documents; exploration artifacts run like scripts.
    pub fn verifier_command(&self, kind: ArtifactKind) -> &[String] {
        match kind {
            ArtifactKind::Document | ArtifactKind::Manuscript => &self.verifiers.document,
            ArtifactKind::NumericScript | ArtifactKind::ExplorationArtifact => {
                &self.verifiers.script
            }
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `OrchestratorConfig::default()`.
pub fn load_config(path: &Path) -> Result<OrchestratorConfig> {
    if !path.exists() {
        let cfg = OrchestratorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OrchestratorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &OrchestratorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gate::TrackThresholds;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, OrchestratorConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = OrchestratorConfig::default();
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn bad_threshold_table_is_fatal_at_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut cfg = OrchestratorConfig::default();
        cfg.thresholds.production = TrackThresholds {
            block_below: 95,
            warn_below: Some(85),
        };
        let mut buf = toml::to_string_pretty(&cfg).expect("serialize");
        buf.push('\n');
        fs::write(&path, buf).expect("write raw");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn empty_verifier_command_is_rejected() {
        let mut cfg = OrchestratorConfig::default();
        cfg.verifiers.script = Vec::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn verifier_command_maps_kinds() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(
            cfg.verifier_command(ArtifactKind::Manuscript),
            cfg.verifiers.document.as_slice()
        );
        assert_eq!(
            cfg.verifier_command(ArtifactKind::ExplorationArtifact),
            cfg.verifiers.script.as_slice()
        );
    }
}
