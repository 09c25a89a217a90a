//! Per-attempt capture artifacts and the aggregate error log.
//!
//! Every invocation leaves one deterministically named attempt log under
//! `.dispatch/attempts/`, and every failed attempt additionally appends its
//! full captured output to `.dispatch/errors.log`. Both are product output
//! for human review; the dispatcher itself never reads them back.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::core::types::{InvocationRecord, WorkItem};
use crate::io::process::Captured;

/// Deterministic attempt log path: `<mode>-item-NNNN-attempt-M.log`.
pub fn attempt_log_path(attempts_dir: &Path, mode: &str, item: &WorkItem, attempt: u32) -> PathBuf {
    attempts_dir.join(format!("{mode}-item-{:04}-attempt-{attempt}.log", item.index))
}

/// Write the full captured output of one invocation to its attempt log.
///
/// Written unconditionally, success or failure: the classifier may need the
/// complete output later and a summary is not enough for forensics.
pub fn write_attempt_log(path: &Path, captured: &Captured) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create attempt log dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(&String::from_utf8_lossy(&captured.stdout));
    if captured.dropped_stdout > 0 {
        buf.push_str(&format!("\n[stdout truncated {} bytes]\n", captured.dropped_stdout));
    }
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&String::from_utf8_lossy(&captured.stderr));
    if captured.dropped_stderr > 0 {
        buf.push_str(&format!("\n[stderr truncated {} bytes]\n", captured.dropped_stderr));
    }
    if captured.timed_out {
        buf.push_str("\n[invocation timed out]\n");
    }
    fs::write(path, buf).with_context(|| format!("write attempt log {}", path.display()))
}

/// Append one failed attempt's full output to the aggregate error log.
pub fn append_error_log(
    path: &Path,
    item: &WorkItem,
    attempt: u32,
    record: &InvocationRecord,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create error log dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str(&format!(
        "=== {} attempt {} at {} (exit {:?}) ===\n",
        item.id,
        attempt,
        Utc::now().to_rfc3339(),
        record.exit_code,
    ));
    buf.push_str(&record.stdout);
    if !record.stderr.is_empty() {
        buf.push_str("\n--- stderr ---\n");
        buf.push_str(&record.stderr);
    }
    buf.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open error log {}", path.display()))?;
    file.write_all(buf.as_bytes())
        .with_context(|| format!("append error log {}", path.display()))
}
