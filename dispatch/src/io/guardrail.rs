//! Append-only dead-letter log (`.dispatch/guardrails.jsonl`).
//!
//! One JSON object per line, written once when an item is dead-lettered and
//! never rewritten. Repeated dead-lettering across runs appends additional
//! entries; duplicates are expected and tolerated. The dispatcher's own
//! decisions never read this file back — it exists for humans, and for the
//! request renderer to bias future prompts.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One dead-lettered item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardrailEntry {
    pub item: String,
    pub reason: String,
    /// RFC 3339 timestamp of the dead-lettering.
    pub at: String,
}

impl GuardrailEntry {
    pub fn now(item: &str, reason: &str) -> Self {
        Self {
            item: item.to_string(),
            reason: reason.to_string(),
            at: Utc::now().to_rfc3339(),
        }
    }
}

/// Append one entry to the guardrail log.
pub fn append_guardrail(path: &Path, entry: &GuardrailEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create guardrail dir {}", parent.display()))?;
    }
    let mut line = serde_json::to_string(entry).context("serialize guardrail entry")?;
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open guardrail log {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("append guardrail log {}", path.display()))
}

/// Load all guardrail entries. An absent file yields an empty list.
pub fn load_guardrails(path: &Path) -> Result<Vec<GuardrailEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read guardrail log {}", path.display()))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("parse guardrail entry on line {}", i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_log_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let entries = load_guardrails(&temp.path().join("guardrails.jsonl")).expect("load");
        assert!(entries.is_empty());
    }

    #[test]
    fn appends_accumulate_without_dedup() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("guardrails.jsonl");

        let entry = GuardrailEntry::now("tests/a.rs", "no verdict in agent output");
        append_guardrail(&path, &entry).expect("append");
        append_guardrail(&path, &entry).expect("append");

        let entries = load_guardrails(&path).expect("load");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].item, "tests/a.rs");
        assert_eq!(entries[1], entries[0]);
    }

    #[test]
    fn corrupt_line_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("guardrails.jsonl");
        fs::write(&path, "not json\n").expect("write");
        assert!(load_guardrails(&path).is_err());
    }
}
