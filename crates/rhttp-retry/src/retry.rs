//! The retry orchestrator (spec §4.1.4).

use crate::backoff::full_jitter_delay;
use crate::config::RetryConfig;
use crate::events::RetryEvent;
use crate::policy::AttemptOutcome;
use crate::retry_after;
use http::HeaderMap;
use std::time::{Duration, Instant};

/// What the caller should do after an attempt fails.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then run another attempt.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// Whether `delay` was taken from a `Retry-After`-style header
        /// rather than computed from the backoff schedule.
        from_retry_after: bool,
    },
    /// Give up and return the outcome of the last attempt to the caller.
    Stop,
}

/// Drives the retry decision for one logical request across attempts.
///
/// A single [`RetryPolicy`] instance is stateless between calls; the caller
/// passes the current attempt number on every call.
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Decides what to do after `outcome`, the result of `attempt` (the
    /// 1-based count of attempts made so far, including this one).
    ///
    /// `response_headers` is consulted for a `Retry-After`-style header
    /// when `outcome` is an HTTP error on a status that honors one.
    /// `remaining_total` is the time left before the overall deadline, if
    /// any; a server-directed delay is clamped against it.
    pub fn decide(
        &self,
        attempt: u32,
        outcome: &AttemptOutcome,
        response_headers: Option<&HeaderMap>,
        remaining_total: Option<Duration>,
    ) -> RetryDecision {
        if !self.config.predicate.is_retriable(outcome) {
            return RetryDecision::Stop;
        }

        if attempt > self.config.max_retries {
            self.emit_exhausted(attempt);
            return RetryDecision::Stop;
        }

        let (delay, from_retry_after) = self.next_delay(attempt, outcome, response_headers);
        let (delay, _) = retry_after::clamp_to_deadline(delay, remaining_total);
        self.emit_scheduled(attempt + 1, delay, from_retry_after);
        RetryDecision::Retry {
            delay,
            from_retry_after,
        }
    }

    fn next_delay(
        &self,
        attempt: u32,
        outcome: &AttemptOutcome,
        response_headers: Option<&HeaderMap>,
    ) -> (Duration, bool) {
        if let AttemptOutcome::HttpStatus { status, .. } = outcome {
            if retry_after::applies_to(*status) {
                if let Some(headers) = response_headers {
                    if let Some(delay) = retry_after::parse_retry_delay(headers) {
                        return (delay, true);
                    }
                }
            }
        }

        let delay = full_jitter_delay(
            attempt.saturating_sub(1),
            self.config.initial_delay,
            self.config.exponent,
            self.config.max_delay,
        );
        (delay, false)
    }

    fn emit_scheduled(&self, attempt: u32, delay: Duration, from_retry_after: bool) {
        self.config.event_listeners.emit(&RetryEvent::RetryScheduled {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempt,
            delay,
            from_retry_after,
        });
    }

    fn emit_exhausted(&self, attempts: u32) {
        self.config.event_listeners.emit(&RetryEvent::RetriesExhausted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
    }
}
