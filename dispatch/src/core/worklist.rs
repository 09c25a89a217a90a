//! Worklist text parsing.

use crate::core::types::WorkItem;

/// Parse worklist text into an ordered list of work items.
///
/// One identifier per line. Blank lines and `#` comments are skipped;
/// surviving lines are indexed in order. The list is treated as fixed and
/// pre-materialized for a run, so parsing performs no deduplication or
/// normalization beyond trimming.
pub fn parse_worklist(contents: &str) -> Vec<WorkItem> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(index, id)| WorkItem {
            id: id.to_string(),
            index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_order_with_indices() {
        let items = parse_worklist("tests/a.rs\ntests/b.rs:10\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "tests/a.rs");
        assert_eq!(items[0].index, 0);
        assert_eq!(items[1].id, "tests/b.rs:10");
        assert_eq!(items[1].index, 1);
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let items = parse_worklist("# reviewed files\n\n  \ntests/a.rs\n\n# trailing\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "tests/a.rs");
        assert_eq!(items[0].index, 0);
    }

    #[test]
    fn empty_input_is_empty_list() {
        assert!(parse_worklist("").is_empty());
    }
}
