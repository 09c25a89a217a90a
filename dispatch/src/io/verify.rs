//! Side-effect corroboration for claimed approvals.
//!
//! The classifier's "approved" is necessary but not sufficient: the
//! dispatcher independently checks that the item's artifact actually
//! changed between the start and end of the attempt. An approval with no
//! observable change is treated as a failure, never as success.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::types::WorkItem;

/// Fingerprints the artifact behind a work item.
pub trait ChangeDetector {
    /// Content fingerprint, or `None` when the artifact does not exist.
    fn fingerprint(&self, item: &WorkItem) -> Result<Option<String>>;
}

/// Detector that hashes the artifact's file contents.
pub struct FileFingerprint {
    root: PathBuf,
}

impl FileFingerprint {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ChangeDetector for FileFingerprint {
    fn fingerprint(&self, item: &WorkItem) -> Result<Option<String>> {
        let path = self.root.join(item.artifact_path());
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("read artifact {}", path.display()));
            }
        };
        Ok(Some(blake3::hash(&contents).to_hex().to_string()))
    }
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
    fn missing_artifact_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let detector = FileFingerprint::new(temp.path());
        assert_eq!(detector.fingerprint(&item("tests/a.rs")).expect("fp"), None);
    }

    #[test]
    fn fingerprint_tracks_content_changes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let detector = FileFingerprint::new(temp.path());
        fs::create_dir_all(temp.path().join("tests")).expect("mkdir");
        fs::write(temp.path().join("tests/a.rs"), "fn a() {}").expect("write");

        let before = detector.fingerprint(&item("tests/a.rs")).expect("fp");
        let same = detector.fingerprint(&item("tests/a.rs")).expect("fp");
        assert_eq!(before, same);

        fs::write(temp.path().join("tests/a.rs"), "// reviewed\nfn a() {}").expect("write");
        let after = detector.fingerprint(&item("tests/a.rs")).expect("fp");
        assert_ne!(before, after);
    }

    #[test]
    fn line_suffixed_items_resolve_to_the_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let detector = FileFingerprint::new(temp.path());
        fs::create_dir_all(temp.path().join("tests")).expect("mkdir");
        fs::write(temp.path().join("tests/a.rs"), "fn a() {}").expect("write");

        let by_file = detector.fingerprint(&item("tests/a.rs")).expect("fp");
        let by_line = detector.fingerprint(&item("tests/a.rs:12")).expect("fp");
        assert_eq!(by_file, by_line);
    }
}
