//! Retry vs dead-letter policy for the sequential dispatcher.

/// Decision after a failed attempt on the item at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The item gets another attempt.
    Retry,
    /// The item exhausted its budget and is permanently skipped this run.
    DeadLetter,
}

/// Decide whether an item that has now failed `consecutive_failures` times
/// (including the attempt just observed) gets another attempt under
/// `ceiling`.
///
/// Guarantees forward progress: every item terminates within `ceiling`
/// attempts, so the cursor never blocks behind a failing item forever.
pub fn decide(consecutive_failures: u32, ceiling: u32) -> RetryDecision {
    if consecutive_failures >= ceiling {
        RetryDecision::DeadLetter
    } else {
        RetryDecision::Retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_below_ceiling_retry() {
        assert_eq!(decide(1, 3), RetryDecision::Retry);
        assert_eq!(decide(2, 3), RetryDecision::Retry);
    }

    #[test]
    fn failure_at_ceiling_dead_letters() {
        assert_eq!(decide(3, 3), RetryDecision::DeadLetter);
    }

    #[test]
    fn ceiling_of_one_dead_letters_on_first_failure() {
        assert_eq!(decide(1, 1), RetryDecision::DeadLetter);
    }
}
