//! Canonical paths for the `.gatekeeper/` store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::io::config::{OrchestratorConfig, write_config};

/// All canonical paths within `.gatekeeper/` for a workspace root.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    pub store_dir: PathBuf,
    pub config_path: PathBuf,
    pub tasks_dir: PathBuf,
    pub sessions_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let store_dir = root.join(".gatekeeper");
        Self {
            root: root.clone(),
            store_dir: store_dir.clone(),
            config_path: store_dir.join("config.toml"),
            tasks_dir: store_dir.join("tasks"),
            sessions_dir: store_dir.join("sessions"),
            reports_dir: store_dir.join("reports"),
        }
    }

    pub fn manifest_path(&self, task_id: &str) -> PathBuf {
        self.tasks_dir.join(format!("{task_id}.json"))
    }

    pub fn session_path(&self, task_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{task_id}.jsonl"))
    }

    pub fn report_dir(&self, task_id: &str) -> PathBuf {
        self.reports_dir.join(task_id)
    }
}

/// Create `.gatekeeper/` scaffolding. Writes the default config only when
/// missing (or when `force` is set), so a tuned config survives re-init.
pub fn init_store(root: &Path, force: bool) -> Result<StorePaths> {
    let paths = StorePaths::new(root);
    for dir in [
        &paths.store_dir,
        &paths.tasks_dir,
        &paths.sessions_dir,
        &paths.reports_dir,
    ] {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    if force || !paths.config_path.exists() {
        write_config(&paths.config_path, &OrchestratorConfig::default())?;
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_paths_are_stable() {
        let paths = StorePaths::new("/work");
        assert_eq!(paths.config_path, PathBuf::from("/work/.gatekeeper/config.toml"));
        assert_eq!(
            paths.manifest_path("task-1"),
            PathBuf::from("/work/.gatekeeper/tasks/task-1.json")
        );
        assert_eq!(
            paths.session_path("task-1"),
            PathBuf::from("/work/.gatekeeper/sessions/task-1.jsonl")
        );
    }

    #[test]
    fn init_creates_dirs_and_default_config() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_store(temp.path(), false).expect("init");
        assert!(paths.tasks_dir.is_dir());
        assert!(paths.sessions_dir.is_dir());
        assert!(paths.reports_dir.is_dir());
        assert!(paths.config_path.is_file());
    }

    #[test]
    fn init_preserves_existing_config_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_store(temp.path(), false).expect("init");
        fs::write(&paths.config_path, "max_attempts = 7\n").expect("write");
        init_store(temp.path(), false).expect("re-init");
        let contents = fs::read_to_string(&paths.config_path).expect("read");
        assert!(contents.contains("max_attempts = 7"));
    }
}
