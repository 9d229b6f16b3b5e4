//! A durable, Redis-backed [`CacheBackend`] (behind the `redis-backend`
//! feature), standing in for the source system's persistent LRU over a
//! local database (spec §1 "out of scope: concrete storage backends").

use crate::backend::{CacheBackend, CacheProvider};
use crate::cache_control::CacheControlRecord;
use crate::entry::CachedEntry;
use crate::error::CacheError;
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    table: String,
    updated_unix_millis: u128,
    value: Value,
    headers: Vec<(String, String)>,
    cache_control: CacheControlRecord,
}

fn to_persisted(entry: &CachedEntry) -> PersistedEntry {
    PersistedEntry {
        key: entry.key.clone(),
        table: entry.table.clone(),
        updated_unix_millis: entry
            .updated
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis(),
        value: entry.value.clone(),
        headers: entry
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect(),
        cache_control: entry.cache_control.clone(),
    }
}

fn from_persisted(persisted: PersistedEntry) -> CachedEntry {
    let mut headers = HeaderMap::new();
    for (name, value) in persisted.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            headers.insert(name, value);
        }
    }
    CachedEntry {
        key: persisted.key,
        table: persisted.table,
        updated: UNIX_EPOCH + Duration::from_millis(persisted.updated_unix_millis as u64),
        value: persisted.value,
        headers,
        cache_control: persisted.cache_control,
    }
}

/// A [`CacheBackend`] backed by a single Redis hash per table, one field
/// per key.
pub struct PersistentBackend {
    conn: ConnectionManager,
    hash_key: String,
}

impl PersistentBackend {
    /// Connects to `redis_url` and scopes this backend to `table`.
    pub async fn connect(redis_url: &str, table: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(|e| CacheError::BackendUnavailable {
            provider_id: "redis".to_string(),
            message: e.to_string(),
        })?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::BackendUnavailable {
                provider_id: "redis".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            conn,
            hash_key: format!("rhttp-cache:{table}"),
        })
    }
}

impl CacheBackend for PersistentBackend {
    fn available(&self) -> bool {
        true
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CachedEntry>, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let raw: Option<String> = conn
                .hget(&self.hash_key, key)
                .await
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            let Some(raw) = raw else { return Ok(None) };
            let persisted: PersistedEntry =
                serde_json::from_str(&raw).map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            Ok(Some(from_persisted(persisted)))
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
            let entry = CachedEntry {
                key: key.to_string(),
                table: String::new(),
                updated: SystemTime::now(),
                value,
                headers,
                cache_control,
            };
            let raw = serde_json::to_string(&to_persisted(&entry))
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            let mut conn = self.conn.clone();
            let _: () = conn
                .hset(&self.hash_key, key, raw)
                .await
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            Ok(true)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = conn
                .hdel(&self.hash_key, key)
                .await
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<usize, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let count: usize = conn
                .hlen(&self.hash_key)
                .await
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            let _: () = conn
                .del(&self.hash_key)
                .await
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            Ok(count)
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<(), CacheError>> {
        Box::pin(async move { Ok(()) })
    }

    fn keys(&self) -> BoxFuture<'_, Result<Vec<String>, CacheError>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let keys: Vec<String> = conn
                .hkeys(&self.hash_key)
                .await
                .map_err(|e| CacheError::BackendIo { message: e.to_string() })?;
            Ok(keys)
        })
    }
}

/// A [`CacheProvider`] handing out one [`PersistentBackend`] per table,
/// all sharing one Redis connection pool.
pub struct PersistentProvider {
    cache_id: String,
    redis_url: String,
}

impl PersistentProvider {
    /// Creates a new provider registered under `cache_id`, connecting to
    /// `redis_url` lazily as tables are created.
    pub fn new(cache_id: impl Into<String>, redis_url: impl Into<String>) -> Self {
        Self {
            cache_id: cache_id.into(),
            redis_url: redis_url.into(),
        }
    }
}

impl CacheProvider for PersistentProvider {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn create<'a>(&'a self, table: &'a str) -> BoxFuture<'a, Result<Arc<dyn CacheBackend>, CacheError>> {
        Box::pin(async move {
            let backend = PersistentBackend::connect(&self.redis_url, table).await?;
            Ok(Arc::new(backend) as Arc<dyn CacheBackend>)
        })
    }
}
