//! Verdict classification of raw agent output.
//!
//! The [`Classifier`] trait decouples dispatch orchestration from the
//! judgment of what an invocation's output means. The production
//! implementation scans stdout for a verdict token; tests substitute their
//! own implementations or feed scripted output through the real one.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{InvocationRecord, Verdict, WorkItem};

/// Maps a work item plus the raw output of one invocation to a verdict.
pub trait Classifier {
    fn classify(&self, item: &WorkItem, record: &InvocationRecord) -> Verdict;
}

/// Line the agent must emit, e.g. `VERDICT: approved` or
/// `VERDICT: suspect assertion is order-dependent`.
static VERDICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*verdict:\s*(approved|suspect)\b[ \t]*(.*?)\s*$").unwrap()
});

/// Classifier that reads the last `VERDICT:` line from agent stdout.
///
/// A timed-out invocation is suspect regardless of what it printed before
/// being killed. Output without any verdict line is suspect: the agent's
/// silence is never mistaken for success.
#[derive(Debug, Default)]
pub struct TokenClassifier;

impl Classifier for TokenClassifier {
    fn classify(&self, _item: &WorkItem, record: &InvocationRecord) -> Verdict {
        if record.timed_out {
            return Verdict::Suspect {
                reason: "invocation timed out".to_string(),
            };
        }
        let Some(caps) = VERDICT_RE.captures_iter(&record.stdout).last() else {
            return Verdict::Suspect {
                reason: "no verdict in agent output".to_string(),
            };
        };
        let token = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        match token.as_deref() {
            Some("approved") => Verdict::Approved,
            _ => {
                let detail = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let reason = if detail.is_empty() {
                    "agent flagged the item".to_string()
                } else {
                    detail.to_string()
                };
                Verdict::Suspect { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stdout: &str) -> InvocationRecord {
        InvocationRecord {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            timed_out: false,
        }
    }

    fn item() -> WorkItem {
        WorkItem {
            id: "tests/a.rs".to_string(),
            index: 0,
        }
    }

    #[test]
    fn approved_token_is_approved() {
        let verdict = TokenClassifier.classify(&item(), &record("done\nVERDICT: approved\n"));
        assert_eq!(verdict, Verdict::Approved);
    }

    #[test]
    fn suspect_token_carries_reason() {
        let verdict =
            TokenClassifier.classify(&item(), &record("VERDICT: suspect flaky time assertion\n"));
        assert_eq!(
            verdict,
            Verdict::Suspect {
                reason: "flaky time assertion".to_string()
            }
        );
    }

    #[test]
    fn suspect_without_detail_gets_default_reason() {
        let verdict = TokenClassifier.classify(&item(), &record("VERDICT: suspect\n"));
        assert_eq!(
            verdict,
            Verdict::Suspect {
                reason: "agent flagged the item".to_string()
            }
        );
    }

    #[test]
    fn last_verdict_line_wins() {
        let out = "VERDICT: suspect first pass\nreworked\nVERDICT: approved\n";
        assert_eq!(TokenClassifier.classify(&item(), &record(out)), Verdict::Approved);
    }

    #[test]
    fn missing_verdict_is_suspect() {
        let verdict = TokenClassifier.classify(&item(), &record("I think it looks fine!\n"));
        assert_eq!(
            verdict,
            Verdict::Suspect {
                reason: "no verdict in agent output".to_string()
            }
        );
    }

    #[test]
    fn timeout_is_suspect_even_with_approved_token() {
        let mut rec = record("VERDICT: approved\n");
        rec.timed_out = true;
        let verdict = TokenClassifier.classify(&item(), &rec);
        assert_eq!(
            verdict,
            Verdict::Suspect {
                reason: "invocation timed out".to_string()
            }
        );
    }

    #[test]
    fn non_zero_exit_does_not_affect_verdict() {
        let mut rec = record("VERDICT: approved\n");
        rec.exit_code = Some(1);
        assert_eq!(TokenClassifier.classify(&item(), &rec), Verdict::Approved);
    }
}
