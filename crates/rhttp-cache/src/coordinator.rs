//! The caching coordinator: strategy dispatch and write-through (spec §4.2).

use crate::backend::{CacheBackend, CacheRegistry};
use crate::cache_control::CacheControlRecord;
use crate::entry::CachedEntry;
use crate::freshness::{self, CacheState};
use http::{HeaderMap, HeaderValue, StatusCode};
use rhttp_core::error::{ClientError, NoUpdateReason};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

/// Which of the three dispatch strategies a cached request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Consult the cache first; revalidate or fetch only as freshness
    /// requires.
    CacheControl,
    /// Always fetch; fall back to the cache only when the fetch fails.
    FetchFirst,
    /// Run the cache lookup and the fetch concurrently; take whichever is
    /// usable first.
    Race,
}

/// A conditional-request hint derived from a cached entry's validators.
#[derive(Debug, Clone, Default)]
pub struct ConditionalHeaders {
    /// `If-None-Match`, from the cached `ETag`.
    pub if_none_match: Option<String>,
    /// `If-Modified-Since`, from the cached `Last-Modified` (only sent
    /// when no `ETag` was available).
    pub if_modified_since: Option<String>,
}

impl ConditionalHeaders {
    fn from_entry(entry: &CachedEntry) -> Self {
        match entry.etag() {
            Some(etag) => Self {
                if_none_match: Some(etag.to_string()),
                if_modified_since: None,
            },
            None => Self {
                if_none_match: None,
                if_modified_since: entry.last_modified().map(str::to_string),
            },
        }
    }
}

/// The result of a single transport attempt as seen by the coordinator.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// The response status (used to detect `304 Not Modified`).
    pub status: StatusCode,
    /// The response headers (parsed for cache-control directives and
    /// validators).
    pub headers: HeaderMap,
    /// The decoded JSON body. Meaningless when `status == 304`.
    pub value: Value,
}

/// A successful JSON result, cached or fetched.
#[derive(Debug, Clone)]
pub struct JsonResult {
    /// The JSON value.
    pub value: Value,
    /// The headers associated with `value` (from the cache entry or the
    /// fetch response).
    pub headers: HeaderMap,
}

/// What the optional `update` channel resolves to.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// No new value; see [`NoUpdateReason`] for why.
    NoUpdate(NoUpdateReason),
    /// A new value was fetched and differs from the cached one (or there
    /// was nothing cached to compare against).
    Updated(JsonResult),
}

/// The primary result plus an optional future resolving to the `update`
/// channel outcome (populated only when the request asked for `update`).
pub struct DispatchOutcome {
    /// The value to hand back to the caller immediately.
    pub result: JsonResult,
    /// The `update` channel, if requested.
    pub update: Option<std::pin::Pin<Box<dyn Future<Output = UpdateOutcome> + Send>>>,
}

/// Compares two JSON results for the `race` strategy's `update=true`
/// equality check: `ETag`, then `Last-Modified`, then structural equality.
pub fn results_are_equal(cached: &JsonResult, fetched: &JsonResult) -> bool {
    let etag = |h: &HeaderMap| h.get(http::header::ETAG).cloned();
    if let (Some(a), Some(b)) = (etag(&cached.headers), etag(&fetched.headers)) {
        return a == b;
    }
    let last_modified = |h: &HeaderMap| h.get(http::header::LAST_MODIFIED).cloned();
    if let (Some(a), Some(b)) = (last_modified(&cached.headers), last_modified(&fetched.headers)) {
        return a == b;
    }
    cached.value == fetched.value
}

/// Resolves the first available backend among `registry`'s active
/// providers for `table`, per spec §4.2's provider-order rule.
pub async fn resolve_backend(
    registry: &CacheRegistry,
    active: Option<&[String]>,
    table: &str,
) -> Option<Arc<dyn CacheBackend>> {
    for provider in registry.active_providers(active) {
        if let Ok(backend) = provider.create(table).await {
            if backend.available() {
                return Some(backend);
            }
        }
    }
    None
}

/// Drives one cached request against a resolved `backend`.
pub struct CacheCoordinator {
    backend: Arc<dyn CacheBackend>,
}

impl CacheCoordinator {
    /// Creates a coordinator bound to an already-resolved backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Writes `outcome` through to the backend if its effective directives
    /// permit storage. Errors are swallowed: write-through never fails the
    /// request that triggered it (spec §4.2.4).
    pub async fn write_through(
        &self,
        key: &str,
        outcome: &FetchOutcome,
        default_cache_control: &CacheControlRecord,
        forced_cache_control: &CacheControlRecord,
    ) {
        let response_directives = crate::cache_control::parse_from_headers(&outcome.headers, SystemTime::now());
        let effective = default_cache_control
            .merged_with(&response_directives)
            .merged_with(forced_cache_control);

        if effective.no_store == Some(true) {
            return;
        }
        let max_age_zero_without_revalidation = effective
            .max_age
            .map(crate::cache_control::DurationOrBool::is_disabled)
            .unwrap_or(false)
            && effective.must_revalidate != Some(true)
            && effective.no_cache != Some(true);
        if max_age_zero_without_revalidation {
            return;
        }

        if let Err(err) = self
            .backend
            .set(key, outcome.value.clone(), outcome.headers.clone(), effective)
            .await
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, key, "cache write-through failed");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }

    fn effective_state(
        &self,
        entry: &CachedEntry,
        default_cache_control: &CacheControlRecord,
        forced_cache_control: &CacheControlRecord,
    ) -> CacheState {
        let effective = default_cache_control
            .merged_with(&entry.cache_control)
            .merged_with(forced_cache_control);
        freshness::evaluate(&effective, entry.updated, SystemTime::now())
    }

    /// Strategy `cacheControl` (spec §4.2.1).
    pub async fn dispatch_cache_control<F, Fut>(
        &self,
        key: &str,
        default_cache_control: CacheControlRecord,
        forced_cache_control: CacheControlRecord,
        want_update: bool,
        fetch: F,
    ) -> Result<DispatchOutcome, ClientError>
    where
        F: Fn(ConditionalHeaders) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<FetchOutcome, ClientError>> + Send + 'static,
    {
        let cached = self.backend.get(key).await.ok().flatten();

        let state = match &cached {
            Some(entry) => self.effective_state(entry, &default_cache_control, &forced_cache_control),
            None => CacheState::Stale {
                must_revalidate: false,
                stale_while_revalidate: false,
                stale_if_error: false,
            },
        };

        match (cached, state) {
            (Some(entry), CacheState::Fresh) => Ok(DispatchOutcome {
                result: JsonResult {
                    value: entry.value,
                    headers: entry.headers,
                },
                update: want_update.then(|| {
                    boxed_ready(UpdateOutcome::NoUpdate(NoUpdateReason::FreshCache))
                }),
            }),

            (None, _) => {
                let outcome = fetch(ConditionalHeaders::default()).await?;
                self.write_through(key, &outcome, &default_cache_control, &forced_cache_control)
                    .await;
                Ok(DispatchOutcome {
                    result: JsonResult {
                        value: outcome.value,
                        headers: outcome.headers,
                    },
                    update: want_update.then(|| {
                        boxed_ready(UpdateOutcome::NoUpdate(NoUpdateReason::CacheDisabled))
                    }),
                })
            }

            (Some(_), CacheState::Disabled) => {
                let outcome = fetch(ConditionalHeaders::default()).await?;
                self.write_through(key, &outcome, &default_cache_control, &forced_cache_control)
                    .await;
                Ok(DispatchOutcome {
                    result: JsonResult {
                        value: outcome.value,
                        headers: outcome.headers,
                    },
                    update: want_update.then(|| {
                        boxed_ready(UpdateOutcome::NoUpdate(NoUpdateReason::CacheDisabled))
                    }),
                })
            }

            (
                Some(entry),
                CacheState::Stale {
                    stale_while_revalidate,
                    stale_if_error,
                    ..
                },
            ) => {
                let conditional = ConditionalHeaders::from_entry(&entry);

                if stale_while_revalidate {
                    let stale_result = JsonResult {
                        value: entry.value.clone(),
                        headers: entry.headers.clone(),
                    };
                    let coordinator_backend = self.backend.clone();
                    let key = key.to_string();
                    let default_cc = default_cache_control.clone();
                    let forced_cc = forced_cache_control.clone();
                    let fetch = fetch.clone();
                    let background = async move {
                        let coordinator = CacheCoordinator::new(coordinator_backend);
                        match fetch(conditional).await {
                            Ok(outcome) if outcome.status == StatusCode::NOT_MODIFIED => {
                                UpdateOutcome::NoUpdate(NoUpdateReason::Unchanged)
                            }
                            Ok(outcome) => {
                                coordinator.write_through(&key, &outcome, &default_cc, &forced_cc).await;
                                UpdateOutcome::Updated(JsonResult {
                                    value: outcome.value,
                                    headers: outcome.headers,
                                })
                            }
                            Err(_) => UpdateOutcome::NoUpdate(NoUpdateReason::Unchanged),
                        }
                    };

                    return Ok(DispatchOutcome {
                        result: stale_result,
                        update: if want_update {
                            Some(Box::pin(background))
                        } else {
                            tokio::spawn(background);
                            None
                        },
                    });
                }

                match fetch(conditional).await {
                    Ok(outcome) if outcome.status == StatusCode::NOT_MODIFIED => Ok(DispatchOutcome {
                        result: JsonResult {
                            value: entry.value,
                            headers: entry.headers,
                        },
                        update: want_update
                            .then(|| boxed_ready(UpdateOutcome::NoUpdate(NoUpdateReason::Unchanged))),
                    }),
                    Ok(outcome) => {
                        self.write_through(&key, &outcome, &default_cache_control, &forced_cache_control)
                            .await;
                        Ok(DispatchOutcome {
                            result: JsonResult {
                                value: outcome.value,
                                headers: outcome.headers,
                            },
                            update: None,
                        })
                    }
                    Err(err) if stale_if_error && is_revalidation_failure(&err) => Ok(DispatchOutcome {
                        result: JsonResult {
                            value: entry.value,
                            headers: entry.headers,
                        },
                        update: None,
                    }),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Strategy `fetchFirst` (spec §4.2.2).
    pub async fn dispatch_fetch_first<F, Fut>(
        &self,
        key: &str,
        default_cache_control: CacheControlRecord,
        forced_cache_control: CacheControlRecord,
        fetch: F,
    ) -> Result<JsonResult, ClientError>
    where
        F: Fn(ConditionalHeaders) -> Fut,
        Fut: Future<Output = Result<FetchOutcome, ClientError>>,
    {
        match fetch(ConditionalHeaders::default()).await {
            Ok(outcome) => {
                self.write_through(key, &outcome, &default_cache_control, &forced_cache_control)
                    .await;
                Ok(JsonResult {
                    value: outcome.value,
                    headers: outcome.headers,
                })
            }
            Err(err) => {
                let cached = self.backend.get(key).await.ok().flatten();
                match cached {
                    Some(entry) => {
                        let state = self.effective_state(&entry, &default_cache_control, &forced_cache_control);
                        let usable = matches!(state, CacheState::Fresh)
                            || matches!(state, CacheState::Stale { stale_if_error: true, .. });
                        if usable {
                            Ok(JsonResult {
                                value: entry.value,
                                headers: entry.headers,
                            })
                        } else {
                            Err(err)
                        }
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Strategy `race` (spec §4.2.3).
    pub async fn dispatch_race<F, Fut>(
        &self,
        key: &str,
        default_cache_control: CacheControlRecord,
        forced_cache_control: CacheControlRecord,
        want_update: bool,
        fetch: F,
    ) -> Result<DispatchOutcome, ClientError>
    where
        F: Fn(ConditionalHeaders) -> Fut,
        Fut: Future<Output = Result<FetchOutcome, ClientError>> + Send + 'static,
    {
        let cache_lookup = self.backend.get(key);
        let fetch_attempt: std::pin::Pin<Box<Fut>> = Box::pin(fetch(ConditionalHeaders::default()));

        match futures::future::select(cache_lookup, fetch_attempt).await {
            futures::future::Either::Left((cache_result, fetch_attempt)) => {
                let cached = cache_result.ok().flatten();
                match cached {
                    Some(entry) => {
                        let state = self.effective_state(&entry, &default_cache_control, &forced_cache_control);
                        let stale_while_revalidate = matches!(
                            state,
                            CacheState::Stale {
                                stale_while_revalidate: true,
                                ..
                            }
                        );
                        let relaxed_stale = stale_while_revalidate
                            || matches!(
                                state,
                                CacheState::Stale {
                                    stale_if_error: true,
                                    ..
                                }
                            );

                        if matches!(state, CacheState::Fresh) || relaxed_stale {
                            let cached_result = JsonResult {
                                value: entry.value,
                                headers: entry.headers,
                            };
                            if want_update {
                                let default_cc = default_cache_control.clone();
                                let forced_cc = forced_cache_control.clone();
                                let backend = self.backend.clone();
                                let key = key.to_string();
                                let cached_for_compare = cached_result.clone();
                                let update = async move {
                                    match fetch_attempt.await {
                                        Ok(outcome) => {
                                            let coordinator = CacheCoordinator::new(backend);
                                            coordinator.write_through(&key, &outcome, &default_cc, &forced_cc).await;
                                            let fetched = JsonResult {
                                                value: outcome.value,
                                                headers: outcome.headers,
                                            };
                                            if results_are_equal(&cached_for_compare, &fetched) {
                                                UpdateOutcome::NoUpdate(NoUpdateReason::Equal)
                                            } else {
                                                UpdateOutcome::Updated(fetched)
                                            }
                                        }
                                        Err(_) => UpdateOutcome::NoUpdate(NoUpdateReason::Equal),
                                    }
                                };
                                Ok(DispatchOutcome {
                                    result: cached_result,
                                    update: Some(Box::pin(update)),
                                })
                            } else {
                                if stale_while_revalidate {
                                    let default_cc = default_cache_control.clone();
                                    let forced_cc = forced_cache_control.clone();
                                    let backend = self.backend.clone();
                                    let key = key.to_string();
                                    tokio::spawn(async move {
                                        if let Ok(outcome) = fetch_attempt.await {
                                            let coordinator = CacheCoordinator::new(backend);
                                            coordinator.write_through(&key, &outcome, &default_cc, &forced_cc).await;
                                        }
                                    });
                                }
                                Ok(DispatchOutcome {
                                    result: cached_result,
                                    update: None,
                                })
                            }
                        } else {
                            // Stale without a relaxation: treat as a miss, take the fetch branch.
                            let outcome = fetch_attempt.await?;
                            self.write_through(key, &outcome, &default_cache_control, &forced_cache_control)
                                .await;
                            Ok(DispatchOutcome {
                                result: JsonResult {
                                    value: outcome.value,
                                    headers: outcome.headers,
                                },
                                update: None,
                            })
                        }
                    }
                    None => {
                        let outcome = fetch_attempt.await?;
                        self.write_through(key, &outcome, &default_cache_control, &forced_cache_control)
                            .await;
                        Ok(DispatchOutcome {
                            result: JsonResult {
                                value: outcome.value,
                                headers: outcome.headers,
                            },
                            update: want_update.then(|| boxed_ready(UpdateOutcome::NoUpdate(NoUpdateReason::NoCached))),
                        })
                    }
                }
            }
            futures::future::Either::Right((fetch_result, _cache_lookup)) => {
                let outcome = fetch_result?;
                self.write_through(key, &outcome, &default_cache_control, &forced_cache_control)
                    .await;
                Ok(DispatchOutcome {
                    result: JsonResult {
                        value: outcome.value,
                        headers: outcome.headers,
                    },
                    update: None,
                })
            }
        }
    }
}

fn is_revalidation_failure(err: &ClientError) -> bool {
    err.is_network_error()
        || matches!(err.http_status(), Some(status) if status.is_server_error())
}

fn boxed_ready(outcome: UpdateOutcome) -> std::pin::Pin<Box<dyn Future<Output = UpdateOutcome> + Send>> {
    Box::pin(async move { outcome })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_fifo::FifoMemoryBackend;

    fn json_headers(etag: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(etag) = etag {
            headers.insert(http::header::ETAG, HeaderValue::from_str(etag).unwrap());
        }
        headers
    }

    #[tokio::test]
    async fn fresh_hit_returns_cached_value_without_fetching() {
        let backend: Arc<dyn CacheBackend> = Arc::new(FifoMemoryBackend::new(10));
        backend
            .set("k", Value::String("cached".into()), json_headers(None), CacheControlRecord {
                max_age: Some(crate::cache_control::DurationOrBool::Seconds(60)),
                ..Default::default()
            })
            .await
            .unwrap();

        let coordinator = CacheCoordinator::new(backend);
        let outcome = coordinator
            .dispatch_cache_control(
                "k",
                CacheControlRecord::default(),
                CacheControlRecord::default(),
                false,
                |_| async { panic!("should not fetch on a fresh hit") },
            )
            .await
            .unwrap();

        assert_eq!(outcome.result.value, Value::String("cached".into()));
    }

    #[tokio::test]
    async fn miss_fetches_and_writes_through() {
        let backend: Arc<dyn CacheBackend> = Arc::new(FifoMemoryBackend::new(10));
        let coordinator = CacheCoordinator::new(backend.clone());

        let outcome = coordinator
            .dispatch_cache_control(
                "k",
                CacheControlRecord::default(),
                CacheControlRecord::default(),
                false,
                |_| async {
                    Ok(FetchOutcome {
                        status: StatusCode::OK,
                        headers: json_headers(None),
                        value: Value::String("fresh".into()),
                    })
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.result.value, Value::String("fresh".into()));
        assert!(backend.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fetch_first_falls_back_to_stale_if_error_on_failure() {
        let backend: Arc<dyn CacheBackend> = Arc::new(FifoMemoryBackend::new(10));
        backend
            .set(
                "k",
                Value::String("cached".into()),
                json_headers(None),
                CacheControlRecord {
                    max_age: Some(crate::cache_control::DurationOrBool::Bool(false)),
                    stale_if_error: Some(crate::cache_control::DurationOrBool::Bool(true)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let coordinator = CacheCoordinator::new(backend);
        let result = coordinator
            .dispatch_fetch_first(
                "k",
                CacheControlRecord::default(),
                CacheControlRecord::default(),
                |_| async {
                    Err(ClientError::NetworkError {
                        message: "connection reset".into(),
                    })
                },
            )
            .await
            .unwrap();

        assert_eq!(result.value, Value::String("cached".into()));
    }

    #[tokio::test]
    async fn no_store_prevents_write_through() {
        let backend: Arc<dyn CacheBackend> = Arc::new(FifoMemoryBackend::new(10));
        let coordinator = CacheCoordinator::new(backend.clone());

        coordinator
            .write_through(
                "k",
                &FetchOutcome {
                    status: StatusCode::OK,
                    headers: {
                        let mut h = HeaderMap::new();
                        h.insert(http::header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
                        h
                    },
                    value: Value::Bool(true),
                },
                &CacheControlRecord::default(),
                &CacheControlRecord::default(),
            )
            .await;

        assert!(backend.get("k").await.unwrap().is_none());
    }
}
