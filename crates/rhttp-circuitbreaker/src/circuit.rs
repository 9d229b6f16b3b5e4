//! Consecutive-failure circuit breaker state machine (spec §3, §4.1.3).

use crate::classifier::CallOutcome;
use crate::config::CircuitBreakerConfig;
use crate::error::BrokenCircuit;
use crate::events::CircuitBreakerEvent;
use std::sync::Mutex;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::gauge;

/// The circuit breaker's state, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    /// Calls pass through; `consecutive_failures` tracks the current run
    /// of matching failures.
    Closed {
        /// Consecutive matching failures observed since the last success.
        consecutive_failures: u32,
    },
    /// Calls are rejected until `until`.
    Open {
        /// When the circuit becomes eligible to probe recovery.
        until: Instant,
    },
    /// One trial call is in flight to test recovery.
    HalfOpen,
}

impl CircuitState {
    fn label(&self) -> f64 {
        match self {
            CircuitState::Closed { .. } => 0.0,
            CircuitState::Open { .. } => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// A consecutive-failure circuit breaker.
///
/// Counting is consecutive, not windowed: any success resets the streak.
/// While `Open`, every admitted request is rejected with
/// [`BrokenCircuit`] before reaching the transport (spec §3 invariant).
pub struct CircuitBreaker {
    state: Mutex<CircuitState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker from the given configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Mutex::new(CircuitState::Closed {
                consecutive_failures: 0,
            }),
            config,
        }
    }

    /// Returns the current state, transitioning `Open -> HalfOpen` if the
    /// cool-down has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        self.maybe_transition_to_half_open(&mut state);
        *state
    }

    /// Checks whether a new call may proceed, probing `HalfOpen` if the
    /// `Open` cool-down has elapsed.
    pub fn try_acquire(&self) -> Result<(), BrokenCircuit> {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        self.maybe_transition_to_half_open(&mut state);

        match &*state {
            CircuitState::Open { .. } => {
                drop(state);
                let event = CircuitBreakerEvent::CallRejected {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                };
                self.config.event_listeners.emit(&event);
                Err(BrokenCircuit {
                    name: non_default_name(&self.config.name),
                })
            }
            CircuitState::Closed { .. } | CircuitState::HalfOpen => Ok(()),
        }
    }

    /// Records the outcome of a call admitted via [`Self::try_acquire`].
    pub fn record_outcome(&self, outcome: &CallOutcome) {
        let is_failure = self.config.classifier.is_failure(outcome);
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        let from = *state;

        let next = match (*state, is_failure) {
            (CircuitState::HalfOpen, true) => CircuitState::Open {
                until: Instant::now() + self.config.half_open_after,
            },
            (CircuitState::HalfOpen, false) => CircuitState::Closed {
                consecutive_failures: 0,
            },
            (CircuitState::Closed { .. }, false) => CircuitState::Closed {
                consecutive_failures: 0,
            },
            (CircuitState::Closed { consecutive_failures }, true) => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.open_after_failed_attempts {
                    CircuitState::Open {
                        until: Instant::now() + self.config.half_open_after,
                    }
                } else {
                    CircuitState::Closed {
                        consecutive_failures: failures,
                    }
                }
            }
            (open @ CircuitState::Open { .. }, _) => open,
        };

        if next != from {
            *state = next;
            drop(state);
            self.emit_transition(from, next);
        }
    }

    fn maybe_transition_to_half_open(&self, state: &mut CircuitState) {
        if let CircuitState::Open { until } = *state {
            if Instant::now() >= until {
                let from = *state;
                *state = CircuitState::HalfOpen;
                self.emit_transition(from, CircuitState::HalfOpen);
            }
        }
    }

    fn emit_transition(&self, from: CircuitState, to: CircuitState) {
        let event = CircuitBreakerEvent::StateTransition {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            from,
            to,
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        gauge!("circuit_breaker_state", "circuit_breaker" => self.config.name.clone())
            .set(to.label());

        #[cfg(not(feature = "metrics"))]
        let _ = to.label();
    }
}

fn non_default_name(name: &str) -> Option<String> {
    if name == "<unnamed>" {
        None
    } else {
        Some(name.to_string())
    }
}
