//! Retry observability events.

use rhttp_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by [`crate::RetryPolicy`].
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry was scheduled after a failed attempt.
    RetryScheduled {
        /// Retry instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// Which attempt is about to run (1-based; 2 is the first retry).
        attempt: u32,
        /// How long the pipeline will sleep before the next attempt.
        delay: Duration,
        /// Whether `delay` came from a `Retry-After`-style header.
        from_retry_after: bool,
    },
    /// Retries were exhausted; the last failure is being returned.
    RetriesExhausted {
        /// Retry instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// Total attempts made.
        attempts: u32,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::RetryScheduled { .. } => "retry_scheduled",
            RetryEvent::RetriesExhausted { .. } => "retries_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::RetryScheduled { timestamp, .. }
            | RetryEvent::RetriesExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::RetryScheduled { pattern_name, .. }
            | RetryEvent::RetriesExhausted { pattern_name, .. } => pattern_name,
        }
    }
}
