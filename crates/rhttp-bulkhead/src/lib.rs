//! Bulkhead (concurrency-limiting admission control) for the rhttp
//! resilience pipeline.
//!
//! ```rust
//! use rhttp_bulkhead::{Bulkhead, BulkheadConfig};
//! use std::future::pending;
//!
//! # async fn example() {
//! let bulkhead = Bulkhead::new(
//!     BulkheadConfig::builder()
//!         .max_parallel_requests(10)
//!         .max_queued_requests(20)
//!         .name("upstream")
//!         .build(),
//! );
//!
//! let permit = bulkhead.admit(pending::<()>()).await.unwrap();
//! // ... do work while holding `permit` ...
//! drop(permit);
//! # }
//! ```

mod bulkhead;
mod config;
mod error;
mod events;

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadError;
pub use events::BulkheadEvent;
