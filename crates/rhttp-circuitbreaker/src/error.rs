//! Error type for the circuit breaker.

use std::fmt;

/// Error returned by [`crate::CircuitBreaker::try_acquire`] when the
/// circuit is open.
#[derive(Debug, Clone)]
pub struct BrokenCircuit {
    /// Circuit breaker name, if configured.
    pub name: Option<String>,
}

impl fmt::Display for BrokenCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "circuit breaker '{}' is open", name),
            None => write!(f, "circuit breaker is open"),
        }
    }
}

impl std::error::Error for BrokenCircuit {}
