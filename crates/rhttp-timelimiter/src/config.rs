//! Configuration for the time-limiter layer.

use crate::events::TimeLimiterEvent;
use rhttp_core::events::{EventListener, EventListeners};
use std::time::Duration;

/// Configuration for [`crate::TimeLimiter`].
pub struct TimeLimiterConfig {
    pub(crate) per_request_timeout: Option<Duration>,
    pub(crate) overall_deadline: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<TimeLimiterEvent>,
}

impl TimeLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }
}

/// Builder for [`TimeLimiterConfig`].
pub struct TimeLimiterConfigBuilder {
    per_request_timeout: Option<Duration>,
    overall_deadline: Option<Duration>,
    name: String,
    event_listeners: EventListeners<TimeLimiterEvent>,
}

impl Default for TimeLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeLimiterConfigBuilder {
    /// Creates a new builder. Both timers are disabled (`None`) by default;
    /// a layer with neither configured is the identity layer.
    pub fn new() -> Self {
        Self {
            per_request_timeout: None,
            overall_deadline: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets `timeoutRequest`: the per-attempt wall-clock budget.
    pub fn per_request_timeout(mut self, timeout: Duration) -> Self {
        self.per_request_timeout = Some(timeout);
        self
    }

    /// Sets `timeoutTotal`: the whole-call wall-clock budget, covering all
    /// retries, queue waits, and `Retry-After` sleeps.
    pub fn overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }

    /// Sets a name used in events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers an event listener.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<TimeLimiterEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TimeLimiterConfig {
        TimeLimiterConfig {
            per_request_timeout: self.per_request_timeout,
            overall_deadline: self.overall_deadline,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
