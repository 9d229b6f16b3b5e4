//! `Cache-Control` aware caching coordinator for JSON requests (spec §4.2,
//! §4.3).
//!
//! ```no_run
//! use rhttp_cache::{CacheCoordinator, FifoMemoryBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(FifoMemoryBackend::new(256));
//! let coordinator = CacheCoordinator::new(backend);
//! ```

mod backend;
mod cache_control;
mod coordinator;
mod entry;
mod error;
mod freshness;
mod memory_fifo;
mod memory_lru;
#[cfg(feature = "redis-backend")]
mod persistent;

pub use backend::{CacheBackend, CacheProvider, CacheRegistry};
pub use cache_control::{parse_cache_control, parse_from_headers, CacheControlRecord, DurationOrBool};
pub use coordinator::{
    resolve_backend, results_are_equal, CacheCoordinator, CacheMode, ConditionalHeaders, DispatchOutcome,
    FetchOutcome, JsonResult, UpdateOutcome,
};
pub use entry::CachedEntry;
pub use error::CacheError;
pub use freshness::{evaluate as evaluate_freshness, CacheState};
pub use memory_fifo::{FifoMemoryBackend, FifoMemoryProvider};
pub use memory_lru::{LruMemoryBackend, LruMemoryProvider};
#[cfg(feature = "redis-backend")]
pub use persistent::{PersistentBackend, PersistentProvider};
