//! Consecutive-failure circuit breaker for the rhttp resilience pipeline.
//!
//! ```rust
//! use rhttp_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CallOutcome};
//!
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::builder()
//!         .open_after_failed_attempts(5)
//!         .name("upstream")
//!         .build(),
//! );
//!
//! if breaker.try_acquire().is_ok() {
//!     // ... call the transport ...
//!     breaker.record_outcome(&CallOutcome::Success);
//! }
//! ```

mod circuit;
mod classifier;
mod config;
mod error;
mod events;

pub use circuit::{CircuitBreaker, CircuitState};
pub use classifier::{default_status_codes, CallOutcome, FailureClassifier};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::BrokenCircuit;
pub use events::CircuitBreakerEvent;
