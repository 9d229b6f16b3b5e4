//! Freshness evaluation (spec §4.3).

use crate::cache_control::{CacheControlRecord, DurationOrBool};
use std::time::{Duration, SystemTime};

/// The outcome of evaluating a cached entry against effective directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Caching is disabled (`no-store`).
    Disabled,
    /// The entry is fresh and may be returned as-is.
    Fresh,
    /// The entry is stale; revalidation is required, subject to relaxations.
    Stale {
        /// `must-revalidate` applies.
        must_revalidate: bool,
        /// Serving the stale value immediately while revalidating in the
        /// background is allowed.
        stale_while_revalidate: bool,
        /// Serving the stale value is allowed if revalidation fails.
        stale_if_error: bool,
    },
}

/// Evaluates `record` against an entry last `updated` at `now`.
pub fn evaluate(record: &CacheControlRecord, updated: SystemTime, now: SystemTime) -> CacheState {
    if record.no_store == Some(true) {
        return CacheState::Disabled;
    }

    let max_age_disabled = record.max_age.map(DurationOrBool::is_disabled).unwrap_or(false);
    let no_cache = record.no_cache == Some(true) || (max_age_disabled && record.must_revalidate == Some(true));

    if no_cache {
        return CacheState::Stale {
            must_revalidate: record.must_revalidate.unwrap_or(false),
            stale_while_revalidate: false,
            stale_if_error: false,
        };
    }

    let max_age = match record.max_age {
        None => return CacheState::Fresh,
        Some(DurationOrBool::Bool(true)) => return CacheState::Fresh,
        Some(DurationOrBool::Bool(false)) => 0,
        Some(DurationOrBool::Seconds(s)) => s,
    };

    let age = now.duration_since(updated).unwrap_or(Duration::ZERO);
    if age <= Duration::from_secs(max_age) {
        return CacheState::Fresh;
    }

    let relaxation_applies = |relax: Option<DurationOrBool>| -> bool {
        match relax {
            None => false,
            Some(DurationOrBool::Bool(b)) => b,
            Some(DurationOrBool::Seconds(seconds)) => {
                age <= Duration::from_secs(max_age) + Duration::from_secs(seconds)
            }
        }
    };

    CacheState::Stale {
        must_revalidate: record.must_revalidate.unwrap_or(false),
        stale_while_revalidate: relaxation_applies(record.stale_while_revalidate),
        stale_if_error: relaxation_applies(record.stale_if_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(max_age: u64) -> CacheControlRecord {
        CacheControlRecord {
            max_age: Some(DurationOrBool::Seconds(max_age)),
            ..Default::default()
        }
    }

    #[test]
    fn fresh_within_max_age() {
        let now = SystemTime::now();
        let updated = now - Duration::from_secs(10);
        assert_eq!(evaluate(&record(60), updated, now), CacheState::Fresh);
    }

    #[test]
    fn max_age_zero_is_stale() {
        let now = SystemTime::now();
        assert_eq!(
            evaluate(&record(0), now, now),
            CacheState::Stale {
                must_revalidate: false,
                stale_while_revalidate: false,
                stale_if_error: false
            }
        );
    }

    #[test]
    fn no_store_is_disabled() {
        let record = CacheControlRecord {
            no_store: Some(true),
            ..Default::default()
        };
        let now = SystemTime::now();
        assert_eq!(evaluate(&record, now, now), CacheState::Disabled);
    }

    #[test]
    fn no_cache_without_max_age_is_stale_and_must_revalidate() {
        let record = CacheControlRecord {
            no_cache: Some(true),
            must_revalidate: Some(true),
            ..Default::default()
        };
        let now = SystemTime::now();
        assert_eq!(
            evaluate(&record, now, now),
            CacheState::Stale {
                must_revalidate: true,
                stale_while_revalidate: false,
                stale_if_error: false
            }
        );
    }

    #[test]
    fn stale_while_revalidate_relaxation_applies_within_window() {
        let now = SystemTime::now();
        let updated = now - Duration::from_secs(65);
        let record = CacheControlRecord {
            max_age: Some(DurationOrBool::Seconds(60)),
            stale_while_revalidate: Some(DurationOrBool::Seconds(30)),
            ..Default::default()
        };
        assert_eq!(
            evaluate(&record, updated, now),
            CacheState::Stale {
                must_revalidate: false,
                stale_while_revalidate: true,
                stale_if_error: false
            }
        );
    }

    #[test]
    fn relaxation_expires_outside_its_window() {
        let now = SystemTime::now();
        let updated = now - Duration::from_secs(200);
        let record = CacheControlRecord {
            max_age: Some(DurationOrBool::Seconds(60)),
            stale_while_revalidate: Some(DurationOrBool::Seconds(30)),
            ..Default::default()
        };
        assert_eq!(
            evaluate(&record, updated, now),
            CacheState::Stale {
                must_revalidate: false,
                stale_while_revalidate: false,
                stale_if_error: false
            }
        );
    }
}
