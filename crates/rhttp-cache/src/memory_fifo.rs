//! An in-memory backend with first-in-first-out eviction.

use crate::backend::{CacheBackend, CacheProvider};
use crate::cache_control::CacheControlRecord;
use crate::entry::CachedEntry;
use crate::error::CacheError;
use futures::future::BoxFuture;
use http::HeaderMap;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

struct Store {
    order: VecDeque<String>,
    entries: HashMap<String, CachedEntry>,
    capacity: usize,
}

impl Store {
    fn insert(&mut self, key: String, entry: CachedEntry) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, entry);
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

/// A bounded, first-in-first-out in-memory [`CacheBackend`].
///
/// Evicts the oldest-inserted key once the configured capacity is exceeded;
/// unlike an LRU it does not promote on access.
pub struct FifoMemoryBackend {
    store: Mutex<Store>,
}

impl FifoMemoryBackend {
    /// Creates a new backend bounded at `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Mutex::new(Store {
                order: VecDeque::new(),
                entries: HashMap::new(),
                capacity: capacity.max(1),
            }),
        }
    }
}

impl CacheBackend for FifoMemoryBackend {
    fn available(&self) -> bool {
        true
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntry>, CacheError>> {
        Box::pin(async move { Ok(self.store.lock().unwrap().entries.get(key).cloned()) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        headers: HeaderMap,
        cache_control: CacheControlRecord,
    ) -> BoxFuture<'a, Result<bool, CacheError>> {
        Box::pin(async move {
            let mut store = self.store.lock().unwrap();
            let updated = match store.entries.get(key) {
                Some(existing) if existing.updated > SystemTime::now() => existing.updated,
                _ => SystemTime::now(),
            };
            store.insert(
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
            self.store.lock().unwrap().remove(key);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<usize, CacheError>> {
        Box::pin(async move {
            let mut store = self.store.lock().unwrap();
            let count = store.entries.len();
            store.entries.clear();
            store.order.clear();
            Ok(count)
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move { Ok(()) })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, CacheError>> {
        Box::pin(async move { Ok(self.store.lock().unwrap().order.iter().cloned().collect()) })
    }
}

/// A [`CacheProvider`] that hands out one [`FifoMemoryBackend`] per table,
/// all sharing the same per-table capacity.
pub struct FifoMemoryProvider {
    cache_id: String,
    capacity: usize,
    tables: Mutex<HashMap<String, Arc<FifoMemoryBackend>>>,
}

impl FifoMemoryProvider {
    /// Creates a new provider registered under `cache_id`, bounding every
    /// table it creates at `capacity` entries.
    pub fn new(cache_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            cache_id: cache_id.into(),
            capacity,
            tables: Mutex::new(HashMap::new()),
        }
    }
}

impl CacheProvider for FifoMemoryProvider {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn create<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Arc<dyn CacheBackend>, CacheError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let backend = tables
                .entry(table.to_string())
                .or_insert_with(|| Arc::new(FifoMemoryBackend::new(self.capacity)))
                .clone();
            Ok(backend as Arc<dyn CacheBackend>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evicts_the_oldest_entry_once_over_capacity() {
        let backend = FifoMemoryBackend::new(2);
        backend.set("a", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();
        backend.set("b", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();
        backend.set("c", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();

        assert!(backend.get("a").await.unwrap().is_none());
        assert!(backend.get("b").await.unwrap().is_some());
        assert!(backend.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_and_clear_remove_entries() {
        let backend = FifoMemoryBackend::new(10);
        backend.set("a", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();
        backend.delete("a").await.unwrap();
        assert!(backend.get("a").await.unwrap().is_none());

        backend.set("b", Value::Bool(true), HeaderMap::new(), CacheControlRecord::default()).await.unwrap();
        let cleared = backend.clear().await.unwrap();
        assert_eq!(cleared, 1);
        assert!(backend.keys().await.unwrap().is_empty());
    }
}
