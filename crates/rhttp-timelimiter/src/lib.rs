//! Per-request timeout and overall deadline for the rhttp resilience
//! pipeline (spec §4.1.1).
//!
//! ```no_run
//! use rhttp_timelimiter::{TimeLimiter, TimeLimiterConfig};
//! use std::time::Duration;
//!
//! let limiter = TimeLimiter::new(
//!     TimeLimiterConfig::builder()
//!         .per_request_timeout(Duration::from_secs(5))
//!         .overall_deadline(Duration::from_secs(30))
//!         .build(),
//! );
//! let deadline = limiter.start_deadline();
//! ```

mod config;
mod deadline;
mod error;
mod events;
mod timelimiter;

pub use config::{TimeLimiterConfig, TimeLimiterConfigBuilder};
pub use deadline::Deadline;
pub use error::TimeLimiterError;
pub use events::TimeLimiterEvent;
pub use timelimiter::TimeLimiter;
