//! Task manifest storage under `.gatekeeper/tasks/`.
//!
//! Manifests are written once at `start` (atomic temp file + rename) and
//! only ever read afterwards; mutable task state lives in the session log.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::{Rng, distributions::Alphanumeric};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::task::TaskManifest;

/// Generate a unique task id: creation timestamp plus a random suffix.
pub fn generate_task_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let mut rng = rand::thread_rng();
    let suffix: String = std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase();
    format!("task-{timestamp}-{suffix}")
}

/// SHA-256 of the artifact content, recorded in the manifest for later
/// baseline comparison.
pub fn artifact_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read artifact {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    Ok(hex::encode(hasher.finalize()))
}

pub fn load_manifest(path: &Path) -> Result<TaskManifest> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
    let manifest: TaskManifest = serde_json::from_str(&contents)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    Ok(manifest)
}

/// Atomically write a manifest (temp file + rename).
pub fn write_manifest(path: &Path, manifest: &TaskManifest) -> Result<()> {
    debug!(path = %path.display(), task_id = %manifest.id, "writing manifest");
    let parent = path
        .parent()
        .with_context(|| format!("manifest path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = serde_json::to_string_pretty(manifest)?;
    buf.push('\n');
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp manifest {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace manifest {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ArtifactKind, Track};

    #[test]
    fn task_ids_are_unique_and_well_formed() {
        let a = generate_task_id();
        let b = generate_task_id();
        assert!(a.starts_with("task-"));
        assert_ne!(a, b);
    }

    #[test]
    fn manifest_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tasks").join("task-1.json");
        let manifest = TaskManifest {
            id: "task-1".to_string(),
            kind: ArtifactKind::NumericScript,
            track: Track::Exploration,
            artifact: "analysis/gmm.R".to_string(),
            artifact_sha256: "abc123".to_string(),
            plan: vec!["re-run with clustered errors".to_string()],
            created_at: "2025-06-12T14:35:01Z".to_string(),
        };
        write_manifest(&path, &manifest).expect("write");
        let loaded = load_manifest(&path).expect("load");
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn artifact_hash_is_stable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let artifact = temp.path().join("model.R");
        fs::write(&artifact, "lm(y ~ x)").expect("write");
        let first = artifact_sha256(&artifact).expect("hash");
        let second = artifact_sha256(&artifact).expect("hash");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }
}
