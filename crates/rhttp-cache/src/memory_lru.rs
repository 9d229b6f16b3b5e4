//! An in-memory backend with least-recently-used eviction and an optional
//! hard TTL independent of `Cache-Control` freshness.

use crate::backend::{CacheBackend, CacheProvider};
use crate::cache_control::CacheControlRecord;
use crate::entry::CachedEntry;
use crate::error::CacheError;
use futures::future::BoxFuture;
use http::HeaderMap;
use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// A bounded, least-recently-used in-memory [`CacheBackend`].
///
/// Access via `get` promotes the entry, unlike [`crate::FifoMemoryBackend`].
/// An optional `ttl` evicts entries outright (not merely marks them stale)
/// once their age exceeds it, independent of the `Cache-Control` directives
/// recorded on the entry.
pub struct LruMemoryBackend {
    cache: Mutex<LruCache<String, CachedEntry>>,
    ttl: Option<Duration>,
}

impl LruMemoryBackend {
    /// Creates a new backend bounded at `capacity` entries, with an
    /// optional hard `ttl`.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1"),
            )),
            ttl,
        }
    }

    fn is_expired(&self, entry: &CachedEntry) -> bool {
        match self.ttl {
            Some(ttl) => SystemTime::now().duration_since(entry.updated).unwrap_or(Duration::ZERO) > ttl,
            None => false,
        }
    }
}

impl CacheBackend for LruMemoryBackend {
    fn available(&self) -> bool {
        true
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntry>, CacheError>> {
        Box::pin(async move {
            let mut cache = self.cache.lock().unwrap();
            let expired = match cache.get(key) {
                Some(entry) => self.is_expired(entry),
                None => return Ok(None),
            };
            if expired {
                cache.pop(key);
                return Ok(None);
            }
            Ok(cache.get(key).cloned())
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        headers: HeaderMap,
        cache_control: CacheControlRecord,
    ) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut cache = self.cache.lock().unwrap();
            let updated = match cache.peek(key) {
                Some(existing) if existing.updated > SystemTime::now() => existing.updated,
                _ => SystemTime::now(),
            };
            cache.put(
                key.to_string(),
                CachedEntry {
                    key: key.to_string(),
                    table: String::new(),
                    updated,
                    value,
                    headers,
                    cache_control,
                },
            );
            Ok(true)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            self.cache.lock().unwrap().pop(key);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<usize, CacheError>> {
        Box::pin(async move {
            let mut cache = self.cache.lock().unwrap();
            let count = cache.len();
            cache.clear();
            Ok(count)
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move { Ok(()) })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, CacheError>> {
        Box::pin(async move { Ok(self.cache.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()) })
    }
}

/// A [`CacheProvider`] that hands out one [`LruMemoryBackend`] per table.
pub struct LruMemoryProvider {
    cache_id: String,
    capacity: usize,
    ttl: Option<Duration>,
    tables: Mutex<HashMap<String, Arc<LruMemoryBackend>>>,
}

impl LruMemoryProvider {
    /// Creates a new provider registered under `cache_id`.
    pub fn new(cache_id: impl Into<String>, capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            cache_id: cache_id.into(),
            capacity,
            ttl,
            tables: Mutex::new(HashMap::new()),
        }
    }
}

impl CacheProvider for LruMemoryProvider {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn create<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Arc<dyn CacheBackend>, CacheError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let backend = tables
                .entry(table.to_string())
                .or_insert_with(|| Arc::new(LruMemoryBackend::new(self.capacity, self.ttl)))
                .clone();
            Ok(backend as Arc<dyn CacheBackend>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn access_promotes_an_entry_past_eviction() {
        let backend = LruMemoryBackend::new(2, None);
        backend.set("a", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();
        backend.set("b", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();

        backend.get("a").await.unwrap();
        backend.set("c", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();

        assert!(backend.get("a").await.unwrap().is_some());
        assert!(backend.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_older_than_ttl_are_evicted_on_access() {
        let backend = LruMemoryBackend::new(10, Some(Duration::from_secs(0)));
        backend.set("a", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(backend.get("a").await.unwrap().is_none());
    }
}
