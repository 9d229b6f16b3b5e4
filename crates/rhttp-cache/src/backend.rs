//! The cache backend contract and provider registry (spec §6).

use crate::cache_control::CacheControlRecord;
use crate::entry::CachedEntry;
use crate::error::CacheError;
use futures::future::BoxFuture;
use http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

static PROVIDER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").expect("valid regex"));

/// A keyed object store for one `(provider, table)` pair.
///
/// Implementors back one of the three concrete stores this crate ships
/// ([`crate::FifoMemoryBackend`], [`crate::LruMemoryBackend`],
/// [`crate::PersistentBackend`]) or a caller-supplied one.
pub trait CacheBackend: Send + Sync {
    /// Whether this backend can currently serve requests.
    fn available(&self) -> bool;

    /// Looks up `key`. Returns `None` on a miss.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntry>, CacheError>>;

    /// Writes `value` under `key`. Returns `Ok(true)` if the write
    /// succeeded.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Value,
        headers: HeaderMap,
        cache_control: CacheControlRecord,
    ) -> BoxFuture<'a, Result<bool, CacheError>>;

    /// Removes `key`, if present.
    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>>;

    /// Removes every entry, returning the number removed.
    fn clear(&self) -> BoxFuture<'_, Result<usize, CacheError>>;

    /// Releases any resources held by this backend (connections, handles).
    fn close(&self) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Enumerates every key currently stored.
    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, CacheError>>;
}

/// A factory for [`CacheBackend`]s scoped to one provider id.
pub trait CacheProvider: Send + Sync {
    /// A stable identifier for this provider, matching
    /// `^[A-Za-z][A-Za-z0-9_-]{0,63}$`.
    fn cache_id(&self) -> &str;

    /// Creates (or returns a handle to) the backend for `table`.
    fn create<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Arc<dyn CacheBackend>, CacheError>>;
}

/// An ordered registry of [`CacheProvider`]s, consulted in registration
/// order by the coordinator.
#[derive(Default)]
pub struct CacheRegistry {
    providers: Vec<Arc<dyn CacheProvider>>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider`. Re-registering the same `Arc` (the same
    /// loader) under its own id is a no-op; registering a different
    /// provider under an id already in use is an error.
    pub fn register(&mut self, provider: Arc<dyn CacheProvider>) -> Result<(), CacheError> {
        let id = provider.cache_id().to_string();
        if !PROVIDER_ID_PATTERN.is_match(&id) {
            return Err(CacheError::InvalidProviderId { id });
        }

        if let Some(existing) = self.providers.iter().find(|p| p.cache_id() == id) {
            return if Arc::ptr_eq(existing, &provider) {
                Ok(())
            } else {
                Err(CacheError::ProviderConflict { id })
            };
        }

        self.providers.push(provider);
        Ok(())
    }

    /// Returns the providers to consult for a request, in order:
    /// `active` restricts to those ids if given, else all registered
    /// providers are returned in registration order.
    pub fn active_providers(&self, active: Option<&[String]>) -> Vec<Arc<dyn CacheProvider>> {
        match active {
            None => self.providers.clone(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.providers.iter().find(|p| p.cache_id() == id.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Finds the first provider matching `id`.
    pub fn find(&self, id: &str) -> Option<Arc<dyn CacheProvider>> {
        self.providers.iter().find(|p| p.cache_id() == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopProvider(&'static str);
    impl CacheProvider for NoopProvider {
        fn cache_id(&self) -> &str {
            self.0
        }
        fn create<'a>(&'a self, _table: &'a str) -> BoxFuture<'a, Result<Arc<dyn CacheBackend>, CacheError>> {
            Box::pin(async { Err(CacheError::BackendIo { message: "unused in test".into() }) })
        }
    }

    #[test]
    fn rejects_invalid_provider_ids() {
        let mut registry = CacheRegistry::new();
        let result = registry.register(Arc::new(NoopProvider("1bad")));
        assert!(matches!(result, Err(CacheError::InvalidProviderId { .. })));
    }

    #[test]
    fn reregistering_the_same_loader_is_a_no_op() {
        let mut registry = CacheRegistry::new();
        let provider: Arc<dyn CacheProvider> = Arc::new(NoopProvider("memory"));
        registry.register(provider.clone()).unwrap();
        assert!(registry.register(provider).is_ok());
        assert_eq!(registry.active_providers(None).len(), 1);
    }

    #[test]
    fn registering_a_different_loader_under_the_same_id_conflicts() {
        let mut registry = CacheRegistry::new();
        registry.register(Arc::new(NoopProvider("memory"))).unwrap();
        let result = registry.register(Arc::new(NoopProvider("memory")));
        assert!(matches!(result, Err(CacheError::ProviderConflict { .. })));
    }

    #[test]
    fn active_restriction_filters_and_orders_by_request() {
        let mut registry = CacheRegistry::new();
        registry.register(Arc::new(NoopProvider("a"))).unwrap();
        registry.register(Arc::new(NoopProvider("b"))).unwrap();
        let active = vec!["b".to_string()];
        let providers = registry.active_providers(Some(&active));
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].cache_id(), "b");
    }
}
