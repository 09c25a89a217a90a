//! Canonical layout of dispatcher-owned files under `.dispatch/`.

use std::path::{Path, PathBuf};

/// All canonical paths within `.dispatch/` for a project root.
#[derive(Debug, Clone)]
pub struct DispatchPaths {
    pub root: PathBuf,
    pub dispatch_dir: PathBuf,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub pool_state_path: PathBuf,
    pub guardrail_path: PathBuf,
    pub attempts_dir: PathBuf,
    pub error_log_path: PathBuf,
}

impl DispatchPaths {
    /// Layout under the default `.dispatch/` directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_state_dir(root, ".dispatch")
    }

    /// Layout under a configured state directory (`state_dir` in config),
    /// resolved relative to the project root unless absolute.
    pub fn with_state_dir(root: impl Into<PathBuf>, state_dir: &str) -> Self {
        let root = root.into();
        let state_dir_path = Path::new(state_dir);
        let dispatch_dir = if state_dir_path.is_absolute() {
            state_dir_path.to_path_buf()
        } else {
            root.join(state_dir_path)
        };
        Self {
            config_path: dispatch_dir.join("config.toml"),
            state_path: dispatch_dir.join("state.json"),
            pool_state_path: dispatch_dir.join("pool_state.json"),
            guardrail_path: dispatch_dir.join("guardrails.jsonl"),
            attempts_dir: dispatch_dir.join("attempts"),
            error_log_path: dispatch_dir.join("errors.log"),
            root,
            dispatch_dir,
        }
    }

    /// Resolve a path from config relative to the project root.
    pub fn resolve(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
