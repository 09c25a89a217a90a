//! Sequential dispatch state (`.dispatch/state.json`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted bookkeeping for a sequential run.
///
/// This file is the sole source of truth for resume. The cursor only ever
/// increases, and every index below it has been finalized exactly once,
/// either into `processed` or into the guardrail log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SequentialState {
    /// Index of the next unprocessed worklist item.
    pub cursor: usize,
    /// Consecutive-failure counts, keyed by work-item identity rather than
    /// by cursor position so a reordered worklist cannot misattribute them.
    pub failure_counts: BTreeMap<String, u32>,
    /// Item identities that completed successfully, in finalization order.
    pub processed: Vec<String>,
}

impl SequentialState {
    pub fn failures(&self, item_id: &str) -> u32 {
        self.failure_counts.get(item_id).copied().unwrap_or(0)
    }

    /// Record one more consecutive failure and return the new count.
    pub fn record_failure(&mut self, item_id: &str) -> u32 {
        let count = self.failure_counts.entry(item_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Finalize the item at the cursor as processed.
    pub fn advance_processed(&mut self, item_id: &str) {
        self.processed.push(item_id.to_string());
        self.failure_counts.remove(item_id);
        self.cursor += 1;
    }

    /// Finalize the item at the cursor as dead-lettered (the guardrail log
    /// holds the entry; the state only moves past it).
    pub fn advance_dead_lettered(&mut self, item_id: &str) {
        self.failure_counts.remove(item_id);
        self.cursor += 1;
    }
}

/// Load sequential state from disk.
///
/// An absent file is a first run and yields the default state. A present but
/// unreadable file is fatal: guessing a cursor would either re-process
/// committed items or silently skip unattempted ones.
pub fn load_state(path: &Path) -> Result<SequentialState> {
    if !path.exists() {
        debug!(path = %path.display(), "no dispatch state, starting fresh");
        return Ok(SequentialState::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read dispatch state {}", path.display()))?;
    let state: SequentialState = serde_json::from_str(&contents)
        .with_context(|| format!("parse dispatch state {}", path.display()))?;
    debug!(cursor = state.cursor, processed = state.processed.len(), "dispatch state loaded");
    Ok(state)
}

/// Atomically write sequential state to disk (temp file + rename).
pub fn save_state(path: &Path, state: &SequentialState) -> Result<()> {
    debug!(path = %path.display(), cursor = state.cursor, "writing dispatch state");
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace state {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = load_state(&temp.path().join("state.json")).expect("load");
        assert_eq!(state, SequentialState::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");

        let mut state = SequentialState::default();
        state.record_failure("tests/b.rs");
        state.advance_processed("tests/a.rs");

        save_state(&path, &state).expect("save");
        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        fs::write(&path, "{ not json").expect("write");

        let err = load_state(&path).unwrap_err();
        assert!(err.to_string().contains("parse dispatch state"));
    }

    #[test]
    fn advance_clears_failure_count_and_moves_cursor() {
        let mut state = SequentialState::default();
        assert_eq!(state.record_failure("a"), 1);
        assert_eq!(state.record_failure("a"), 2);
        state.advance_processed("a");

        assert_eq!(state.cursor, 1);
        assert_eq!(state.failures("a"), 0);
        assert_eq!(state.processed, vec!["a".to_string()]);
    }

    #[test]
    fn dead_letter_advance_does_not_mark_processed() {
        let mut state = SequentialState::default();
        state.record_failure("a");
        state.advance_dead_lettered("a");

        assert_eq!(state.cursor, 1);
        assert!(state.processed.is_empty());
        assert!(state.failure_counts.is_empty());
    }

    #[test]
    fn default_state_serializes_deterministically() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        save_state(&path, &SequentialState::default()).expect("save");
        let contents = fs::read_to_string(&path).expect("read");
        let expected = "{\n  \"cursor\": 0,\n  \"failure_counts\": {},\n  \"processed\": []\n}\n";
        assert_eq!(contents, expected);
    }
}
