//! Configuration for the retry policy.

use crate::events::RetryEvent;
use crate::policy::{default_retry_methods, default_retry_status_codes, RetryPredicate};
use http::{Method, StatusCode};
use rhttp_core::events::{EventListener, EventListeners};
use std::collections::HashSet;
use std::time::Duration;

/// Configuration for [`crate::RetryPolicy`].
pub struct RetryConfig {
    pub(crate) max_retries: u32,
    pub(crate) predicate: RetryPredicate,
    pub(crate) initial_delay: Duration,
    pub(crate) exponent: f64,
    pub(crate) max_delay: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl RetryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_retries: u32,
    status_codes: HashSet<StatusCode>,
    methods: HashSet<Method>,
    retry_timeout: bool,
    retry_network_errors: bool,
    initial_delay: Duration,
    exponent: f64,
    max_delay: Duration,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults: `max_retries = 0` (no retries), status codes `{408, 420,
    /// 429, 500, 502, 503, 504}`, methods `{GET, HEAD, PUT, DELETE,
    /// OPTIONS, TRACE}`, `retry_timeout = true`, `retry_network_errors =
    /// true`, `initial_delay = 128ms`, `exponent = 2.0`, `max_delay = 30s`.
    pub fn new() -> Self {
        Self {
            max_retries: 0,
            status_codes: default_retry_status_codes(),
            methods: default_retry_methods(),
            retry_timeout: true,
            retry_network_errors: true,
            initial_delay: Duration::from_millis(128),
            exponent: 2.0,
            max_delay: Duration::from_secs(30),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of retries (not counting the initial
    /// attempt); the transport is invoked at most `max_retries + 1` times.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Overrides the set of HTTP status codes considered retriable.
    pub fn status_codes(mut self, codes: impl IntoIterator<Item = StatusCode>) -> Self {
        self.status_codes = codes.into_iter().collect();
        self
    }

    /// Adds `POST` to the set of retriable methods.
    pub fn retry_posts(mut self, retry_posts: bool) -> Self {
        if retry_posts {
            self.methods.insert(Method::POST);
        } else {
            self.methods.remove(&Method::POST);
        }
        self
    }

    /// Sets whether timeouts are retriable.
    pub fn retry_timeout(mut self, retry: bool) -> Self {
        self.retry_timeout = retry;
        self
    }

    /// Sets whether network errors are retriable.
    pub fn retry_network_errors(mut self, retry: bool) -> Self {
        self.retry_network_errors = retry;
        self
    }

    /// Sets the initial backoff delay (before jitter).
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the exponential backoff growth factor.
    pub fn exponent(mut self, exponent: f64) -> Self {
        self.exponent = exponent;
        self
    }

    /// Sets the maximum backoff delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
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
        L: EventListener<RetryEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            predicate: RetryPredicate {
                status_codes: self.status_codes,
                methods: self.methods,
                retry_timeout: self.retry_timeout,
                retry_network_errors: self.retry_network_errors,
            },
            initial_delay: self.initial_delay,
            exponent: self.exponent,
            max_delay: self.max_delay,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
