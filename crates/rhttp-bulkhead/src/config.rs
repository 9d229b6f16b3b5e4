//! Configuration for the bulkhead.

use crate::events::BulkheadEvent;
use rhttp_core::events::{EventListener, EventListeners, FnListener};

/// Configuration for [`crate::Bulkhead`].
pub struct BulkheadConfig {
    pub(crate) max_parallel_requests: usize,
    pub(crate) max_queued_requests: usize,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }
}

/// Builder for [`BulkheadConfig`].
pub struct BulkheadConfigBuilder {
    max_parallel_requests: usize,
    max_queued_requests: usize,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkheadConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults: `max_parallel_requests = 10`, `max_queued_requests = 0`
    /// (no queueing — reject immediately once slots are full).
    pub fn new() -> Self {
        Self {
            max_parallel_requests: 10,
            max_queued_requests: 0,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of simultaneously executing requests.
    pub fn max_parallel_requests(mut self, n: usize) -> Self {
        self.max_parallel_requests = n;
        self
    }

    /// Sets the maximum number of requests allowed to wait in the FIFO
    /// queue once all slots are taken.
    pub fn max_queued_requests(mut self, n: usize) -> Self {
        self.max_queued_requests = n;
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
        L: EventListener<BulkheadEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Registers a closure invoked when a call is admitted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &BulkheadEvent| {
            if let BulkheadEvent::CallPermitted {
                concurrent_calls, ..
            } = event
            {
                f(*concurrent_calls);
            }
        }));
        self
    }

    /// Registers a closure invoked when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &BulkheadEvent| {
            if let BulkheadEvent::CallRejected {
                max_concurrent_calls,
                ..
            } = event
            {
                f(*max_concurrent_calls);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> BulkheadConfig {
        BulkheadConfig {
            max_parallel_requests: self.max_parallel_requests,
            max_queued_requests: self.max_queued_requests,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
