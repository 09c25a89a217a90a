//! Worklist loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::WorkItem;
use crate::core::worklist::parse_worklist;

/// Load the ordered worklist from disk.
///
/// A missing worklist is fatal and reported immediately: no partial run is
/// attempted against a guessed list.
pub fn load_worklist(path: &Path) -> Result<Vec<WorkItem>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read worklist {}", path.display()))?;
    let items = parse_worklist(&contents);
    debug!(path = %path.display(), items = items.len(), "worklist loaded");
    Ok(items)
}
