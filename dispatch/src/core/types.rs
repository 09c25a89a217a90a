//! Shared deterministic types for dispatcher core logic.
//!
//! These types define stable contracts between core components. They should
//! not depend on external state or I/O and must remain deterministic across
//! runs.

use serde::{Deserialize, Serialize};

/// One unit of dispatch: an opaque identifier plus its ordinal position in
/// the worklist. Identity is the string form (`path` or `path:line`).
/// Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub index: usize,
}

impl WorkItem {
    /// The filesystem artifact behind this item.
    ///
    /// For `path:line` identifiers, strips the trailing line suffix; a
    /// suffix that is not all digits is treated as part of the path.
    pub fn artifact_path(&self) -> &str {
        match self.id.rsplit_once(':') {
            Some((path, line))
                if !path.is_empty()
                    && !line.is_empty()
                    && line.bytes().all(|b| b.is_ascii_digit()) =>
            {
                path
            }
            _ => &self.id,
        }
    }
}

/// Judgment over a single agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The agent completed the item and said so.
    Approved,
    /// The agent failed, declined, or produced output the classifier could
    /// not accept.
    Suspect { reason: String },
}

/// Captured result of one worker invocation.
///
/// The exit code is recorded but never interpreted as success or failure on
/// its own: agents are known to exit non-zero on trivial conditions, so only
/// a [`Verdict`] counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> WorkItem {
        WorkItem {
            id: id.to_string(),
            index: 0,
        }
    }

    #[test]
    fn artifact_path_strips_line_suffix() {
        assert_eq!(item("tests/foo.rs:42").artifact_path(), "tests/foo.rs");
    }

    #[test]
    fn artifact_path_keeps_plain_paths() {
        assert_eq!(item("tests/foo.rs").artifact_path(), "tests/foo.rs");
    }

    #[test]
    fn artifact_path_keeps_non_numeric_suffix() {
        assert_eq!(item("c:tests/foo.rs").artifact_path(), "c:tests/foo.rs");
    }
}
