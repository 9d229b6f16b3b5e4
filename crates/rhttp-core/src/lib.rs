//! Core infrastructure shared by every `rhttp` crate.
//!
//! This crate provides:
//! - An event system for observability (`ResilienceEvent`/`EventListener`)
//! - [`ClientError`], the unified error surface returned by the resilience
//!   pipeline and the caching coordinator

pub mod error;
pub mod events;

pub use error::{ClientError, TimeoutLayer};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
