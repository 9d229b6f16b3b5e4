//! Cached entries (spec §3).

use crate::cache_control::CacheControlRecord;
use http::HeaderMap;
use serde_json::Value;
use std::time::SystemTime;

/// A single cached JSON value, identified by `(provider, table, key)`.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// The cache key within `table`.
    pub key: String,
    /// The table (namespace) this entry lives in.
    pub table: String,
    /// When this entry was last written. Monotonically non-decreasing per
    /// key: writers must only overwrite with `now >= existing.updated`.
    pub updated: SystemTime,
    /// The cached JSON value.
    pub value: Value,
    /// Response headers captured at write time (used for conditional
    /// revalidation and re-deriving cache-control directives).
    pub headers: HeaderMap,
    /// The cache-control directives in effect when this entry was written.
    pub cache_control: CacheControlRecord,
}

impl CachedEntry {
    /// The entry's `ETag`, if the origin supplied one.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(http::header::ETAG).and_then(|v| v.to_str().ok())
    }

    /// The entry's `Last-Modified`, if the origin supplied one.
    pub fn last_modified(&self) -> Option<&str> {
        self.headers
            .get(http::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
    }
}
