//! Retry with full-jitter exponential backoff and `Retry-After` support.
//!
//! ```no_run
//! use rhttp_retry::{RetryConfig, RetryPolicy};
//!
//! let policy = RetryPolicy::new(
//!     RetryConfig::builder()
//!         .max_retries(3)
//!         .name("upstream-api")
//!         .build(),
//! );
//! ```

mod backoff;
mod config;
mod events;
mod policy;
mod retry;
mod retry_after;

pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use policy::{default_retry_methods, default_retry_status_codes, AttemptOutcome, RetryPredicate};
pub use retry::{RetryDecision, RetryPolicy};
pub use retry_after::{applies_to as retry_after_applies_to, clamp_to_deadline, parse_retry_delay};
