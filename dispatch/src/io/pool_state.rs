//! Aggregate state for parallel sweeps (`.dispatch/pool_state.json`).

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::Verdict;
use crate::io::state::write_atomic;

/// Lifecycle phase of the most recent sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolPhase {
    Running,
    Complete,
}

/// Persisted aggregate record for parallel dispatch.
///
/// There is no cursor: completion is tracked per item via `completed`, and
/// no ordering across items is guaranteed or required. Counters accumulate
/// across runs; `total` reflects the worklist of the latest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolState {
    pub phase: PoolPhase,
    pub total: usize,
    pub completed: BTreeSet<String>,
    pub approved_count: u32,
    pub suspect_count: u32,
}

impl Default for PoolState {
    fn default() -> Self {
        Self {
            phase: PoolPhase::Running,
            total: 0,
            completed: BTreeSet::new(),
            approved_count: 0,
            suspect_count: 0,
        }
    }
}

impl PoolState {
    /// Record one item's single attempt. Re-recording a completed item is a
    /// no-op so a crashed-and-resumed sweep cannot double count.
    pub fn record(&mut self, item_id: &str, verdict: &Verdict) {
        if !self.completed.insert(item_id.to_string()) {
            return;
        }
        match verdict {
            Verdict::Approved => self.approved_count += 1,
            Verdict::Suspect { .. } => self.suspect_count += 1,
        }
    }
}

/// Load pool state from disk. Absent file yields the default state; a
/// present but unreadable file is fatal, same contract as sequential state.
pub fn load_pool_state(path: &Path) -> Result<PoolState> {
    if !path.exists() {
        debug!(path = %path.display(), "no pool state, starting fresh");
        return Ok(PoolState::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read pool state {}", path.display()))?;
    let state: PoolState = serde_json::from_str(&contents)
        .with_context(|| format!("parse pool state {}", path.display()))?;
    debug!(completed = state.completed.len(), "pool state loaded");
    Ok(state)
}

/// Atomically write pool state to disk (temp file + rename).
pub fn save_pool_state(path: &Path, state: &PoolState) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}
