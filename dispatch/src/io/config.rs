//! Dispatcher configuration stored under `.dispatch/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Dispatcher configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Consecutive failures before an item is dead-lettered (sequential mode).
    pub failure_ceiling: u32,

    /// Maximum number of concurrent invocations (parallel mode).
    pub concurrency_limit: usize,

    /// Wall-clock budget for a single agent invocation, in seconds.
    pub invocation_timeout_secs: u64,

    /// Truncate captured agent stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Worklist file, one item per line, relative to the project root.
    pub worklist_path: String,

    /// Directory holding dispatcher state (state files, guardrail log,
    /// attempt logs), relative to the project root unless absolute. The
    /// config file itself is always read from `.dispatch/config.toml`.
    pub state_dir: String,

    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Command to launch one agent invocation; the request payload is fed
    /// on stdin (e.g. `["codex", "exec", "-"]`).
    pub command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec!["codex".to_string(), "exec".to_string(), "-".to_string()],
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_ceiling: 3,
            concurrency_limit: 4,
            invocation_timeout_secs: 15 * 60,
            output_limit_bytes: 100_000,
            worklist_path: ".dispatch/worklist.txt".to_string(),
            state_dir: ".dispatch".to_string(),
            agent: AgentConfig::default(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.failure_ceiling == 0 {
            return Err(anyhow!("failure_ceiling must be > 0"));
        }
        if self.concurrency_limit == 0 {
            return Err(anyhow!("concurrency_limit must be > 0"));
        }
        if self.invocation_timeout_secs == 0 {
            return Err(anyhow!("invocation_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.worklist_path.trim().is_empty() {
            return Err(anyhow!("worklist_path must be non-empty"));
        }
        if self.state_dir.trim().is_empty() {
            return Err(anyhow!("state_dir must be non-empty"));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty array"));
        }
        Ok(())
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `DispatchConfig::default()`.
pub fn load_config(path: &Path) -> Result<DispatchConfig> {
    if !path.exists() {
        let cfg = DispatchConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: DispatchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &DispatchConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, &buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
