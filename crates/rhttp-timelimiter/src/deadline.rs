//! Overall-deadline tracking (spec §4.1.1).

use std::time::{Duration, Instant};

/// Tracks the wall-clock budget for a whole logical request — all retries,
/// queue waits, and `Retry-After` sleeps included.
///
/// Created once when a request first enters the pipeline and threaded
/// through every attempt.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started_at: Instant,
    total: Option<Duration>,
}

impl Deadline {
    /// Starts a new deadline. `total` is `timeoutTotal`; `None` means no
    /// overall deadline is configured.
    pub fn start(total: Option<Duration>) -> Self {
        Self {
            started_at: Instant::now(),
            total,
        }
    }

    /// Time left before the deadline, or `None` if unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        let total = self.total?;
        let elapsed = self.started_at.elapsed();
        Some(total.saturating_sub(elapsed))
    }

    /// Returns `true` if the deadline has already elapsed.
    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(remaining) if remaining.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_deadline_never_expires() {
        let deadline = Deadline::start(None);
        assert_eq!(deadline.remaining(), None);
        assert!(!deadline.is_expired());
    }

    #[test]
    fn remaining_counts_down_from_total() {
        let deadline = Deadline::start(Some(Duration::from_secs(60)));
        let remaining = deadline.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(58));
    }

    #[test]
    fn zero_budget_is_immediately_expired() {
        let deadline = Deadline::start(Some(Duration::ZERO));
        assert!(deadline.is_expired());
    }
}
