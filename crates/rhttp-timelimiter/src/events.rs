//! Time-limiter observability events.

use rhttp_core::error::TimeoutLayer;
use rhttp_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by [`crate::TimeLimiter`].
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// A timer fired and the in-flight attempt was signalled to abort.
    TimedOut {
        /// Time-limiter instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// Which timer fired.
        layer: TimeoutLayer,
    },
}

impl ResilienceEvent for TimeLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self.layer() {
            TimeoutLayer::PerRequest => "per_request_timeout",
            TimeoutLayer::OverallDeadline => "overall_deadline_exceeded",
        }
    }

    fn timestamp(&self) -> Instant {
        let TimeLimiterEvent::TimedOut { timestamp, .. } = self;
        *timestamp
    }

    fn pattern_name(&self) -> &str {
        let TimeLimiterEvent::TimedOut { pattern_name, .. } = self;
        pattern_name
    }
}

impl TimeLimiterEvent {
    fn layer(&self) -> TimeoutLayer {
        let TimeLimiterEvent::TimedOut { layer, .. } = self;
        *layer
    }
}
