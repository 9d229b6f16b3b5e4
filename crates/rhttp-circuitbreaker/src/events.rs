//! Circuit breaker observability events.

use crate::circuit::CircuitState;
use rhttp_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by [`crate::CircuitBreaker`].
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit transitioned between states.
    StateTransition {
        /// Circuit breaker instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// The prior state.
        from: CircuitState,
        /// The new state.
        to: CircuitState,
    },
    /// A call was rejected because the circuit is open.
    CallRejected {
        /// Circuit breaker instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. } => pattern_name,
        }
    }
}
