//! Errors produced by cache backends and provider registration.

use std::fmt;

/// Failure modes for a [`crate::CacheBackend`] or its registry.
#[derive(Debug, Clone)]
pub enum CacheError {
    /// A provider id did not match `^[A-Za-z][A-Za-z0-9_-]{0,63}$`.
    InvalidProviderId {
        /// The rejected id.
        id: String,
    },
    /// The same provider id was registered twice with different factories.
    ProviderConflict {
        /// The conflicting id.
        id: String,
    },
    /// `create(table)` failed for a backend.
    BackendUnavailable {
        /// Provider id that failed to produce a backend.
        provider_id: String,
        /// A human-readable cause.
        message: String,
    },
    /// A backend I/O operation (`get`/`set`/`delete`/`clear`/`close`) failed.
    BackendIo {
        /// A human-readable cause.
        message: String,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidProviderId { id } => {
                write!(f, "invalid cache provider id: {:?}", id)
            }
            CacheError::ProviderConflict { id } => {
                write!(f, "cache provider {:?} already registered with a different factory", id)
            }
            CacheError::BackendUnavailable { provider_id, message } => {
                write!(f, "cache backend {:?} unavailable: {}", provider_id, message)
            }
            CacheError::BackendIo { message } => write!(f, "cache backend I/O error: {}", message),
        }
    }
}

impl std::error::Error for CacheError {}
