//! Configuration for the circuit breaker.

use crate::classifier::{default_status_codes, FailureClassifier};
use crate::events::CircuitBreakerEvent;
use http::{Method, StatusCode};
use rhttp_core::events::{EventListener, EventListeners};
use std::collections::HashSet;
use std::time::Duration;

/// Configuration for [`crate::CircuitBreaker`].
pub struct CircuitBreakerConfig {
    pub(crate) open_after_failed_attempts: u32,
    pub(crate) half_open_after: Duration,
    pub(crate) classifier: FailureClassifier,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    open_after_failed_attempts: u32,
    half_open_after: Duration,
    status_codes: HashSet<StatusCode>,
    methods: Option<HashSet<Method>>,
    trigger_on_timeout: bool,
    trigger_on_network_error: bool,
    name: String,
    event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults: `open_after_failed_attempts = 5`,
    /// `half_open_after = 30s`, status codes `{408, 420, 429, 500, 502,
    /// 503, 504}`, all methods, `trigger_on_timeout = true`,
    /// `trigger_on_network_error = true`.
    pub fn new() -> Self {
        Self {
            open_after_failed_attempts: 5,
            half_open_after: Duration::from_secs(30),
            status_codes: default_status_codes(),
            methods: None,
            trigger_on_timeout: true,
            trigger_on_network_error: true,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the number of consecutive matching failures that opens the
    /// circuit.
    pub fn open_after_failed_attempts(mut self, n: u32) -> Self {
        self.open_after_failed_attempts = n;
        self
    }

    /// Sets how long the circuit stays `Open` before probing with a
    /// `HalfOpen` trial call.
    pub fn half_open_after(mut self, duration: Duration) -> Self {
        self.half_open_after = duration;
        self
    }

    /// Overrides the set of HTTP status codes counted as failures.
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.status_codes = codes.into_iter().collect();
        self
    }

    /// Restricts failure counting to the given HTTP methods. Default: all
    /// methods.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    /// Sets whether timeouts count as circuit-breaker failures.
    pub fn trigger_on_timeout(mut self, trigger: bool) -> Self {
        self.trigger_on_timeout = trigger;
        self
    }

    /// Sets whether network errors count as circuit-breaker failures.
    pub fn trigger_on_network_error(mut self, trigger: bool) -> Self {
        self.trigger_on_network_error = trigger;
        self
    }

    /// Sets a name used in events and error messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers an event listener.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            open_after_failed_attempts: self.open_after_failed_attempts,
            half_open_after: self.half_open_after,
            classifier: FailureClassifier {
                status_codes: self.status_codes,
                methods: self.methods,
                trigger_on_timeout: self.trigger_on_timeout,
                trigger_on_network_error: self.trigger_on_network_error,
            },
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
