//! The top-level [`Client`]: wires the resilience pipeline, the request
//! context, and the caching coordinator behind one call surface (spec
//! §2, §6).

use crate::context::RequestContext;
use crate::headers::merge_headers;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::transport::{Request, Response, Transport};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method};
use rhttp_cache::{
    CacheCoordinator, CacheMode, CacheRegistry, ConditionalHeaders, DispatchOutcome, FetchOutcome, JsonResult,
    UpdateOutcome,
};
use rhttp_core::error::{ClientError, HttpErrorContext};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Plain (non-caching) request options, common to [`Client::fetch`] and
/// [`Client::fetch_json`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// The HTTP method.
    pub method: Option<Method>,
    /// Caller-supplied headers; take precedence over every default (§4.1.7).
    pub headers: HeaderMap,
    /// The request body, if any.
    pub body: Option<Bytes>,
    /// Treat `status >= 400` as a normal response instead of `HttpResponseError`.
    pub skip_fail_on_error_code: bool,
    /// Skip injecting `Accept: application/json` (JSON requests only).
    pub skip_accept_header: bool,
    /// Skip validating the response `Content-Type` (JSON requests only).
    pub skip_content_type_header_validation: bool,
}

/// Caching options for [`Client::fetch_json`] (spec §4.2, §6
/// "Caching request options").
#[derive(Clone)]
pub struct CacheOptions {
    /// The cache key. A bare [`RequestOptions`] call with no key bypasses
    /// caching entirely.
    pub key: String,
    /// The table to read/write within. Defaults to `"Cached"`.
    pub table: Option<String>,
    /// Which dispatch strategy to use.
    pub mode: CacheMode,
    /// Directives assumed absent a response header; lowest precedence.
    pub default_cache_control: rhttp_cache::CacheControlRecord,
    /// Directives that override both the response and the default; highest
    /// precedence. `no_store` or a disabled `max_age` here bypasses the
    /// coordinator entirely.
    pub forced_cache_control: rhttp_cache::CacheControlRecord,
    /// Restricts which registered providers are consulted, and in what
    /// order. `None` consults all registered providers.
    pub active_cache: Option<Vec<String>>,
    /// Request the `update` channel. Valid with `cacheControl` and `race`.
    pub update: bool,
    /// Bounds how long resolving a cache backend may take.
    pub cache_timeout: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            key: String::new(),
            table: None,
            mode: CacheMode::CacheControl,
            default_cache_control: rhttp_cache::CacheControlRecord::default(),
            forced_cache_control: rhttp_cache::CacheControlRecord::default(),
            active_cache: None,
            update: false,
            cache_timeout: None,
        }
    }
}

/// The result of a JSON request: the decoded value, its headers, and,
/// when requested, the `update` channel.
pub struct JsonResponse {
    /// The decoded JSON value.
    pub value: serde_json::Value,
    /// The headers associated with `value`.
    pub headers: HeaderMap,
    /// Resolves to the background revalidation outcome, if `update` was
    /// requested for a strategy that supports it.
    pub update: Option<std::pin::Pin<Box<dyn std::future::Future<Output = UpdateOutcome> + Send>>>,
}

/// Builds a [`Client`].
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    bulkhead: Option<rhttp_bulkhead::Bulkhead>,
    circuit_breaker: Option<rhttp_circuitbreaker::CircuitBreaker>,
    retry: Option<rhttp_retry::RetryPolicy>,
    time_limiter: Option<rhttp_timelimiter::TimeLimiter>,
    cache_registry: CacheRegistry,
    default_table: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a builder with every resilience layer disabled.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            bulkhead: None,
            circuit_breaker: None,
            retry: None,
            time_limiter: None,
            cache_registry: CacheRegistry::new(),
            default_table: "Cached".to_string(),
        }
    }

    /// Sets the base URL relative targets are joined against.
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets headers applied to every request absent a caller override.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Installs the bulkhead layer.
    pub fn bulkhead(mut self, bulkhead: rhttp_bulkhead::Bulkhead) -> Self {
        self.bulkhead = Some(bulkhead);
        self
    }

    /// Installs the circuit breaker layer.
    pub fn circuit_breaker(mut self, breaker: rhttp_circuitbreaker::CircuitBreaker) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Installs the retry layer.
    pub fn retry(mut self, retry: rhttp_retry::RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Installs the deadline/per-request-timeout layer.
    pub fn time_limiter(mut self, time_limiter: rhttp_timelimiter::TimeLimiter) -> Self {
        self.time_limiter = Some(time_limiter);
        self
    }

    /// Registers a cache provider. Order of registration is the default
    /// consultation order.
    pub fn register_cache_provider(
        mut self,
        provider: Arc<dyn rhttp_cache::CacheProvider>,
    ) -> Result<Self, rhttp_cache::CacheError> {
        self.cache_registry.register(provider)?;
        Ok(self)
    }

    /// Sets the default table name used when a cache request omits one.
    pub fn default_table(mut self, table: impl Into<String>) -> Self {
        self.default_table = table.into();
        self
    }

    /// Builds the client, driving requests through `transport`.
    pub fn build(self, transport: Arc<dyn Transport>) -> Client {
        let mut pipeline_builder = PipelineBuilder::new();
        if let Some(bulkhead) = self.bulkhead {
            pipeline_builder = pipeline_builder.bulkhead(bulkhead);
        }
        if let Some(breaker) = self.circuit_breaker {
            pipeline_builder = pipeline_builder.circuit_breaker(breaker);
        }
        if let Some(retry) = self.retry {
            pipeline_builder = pipeline_builder.retry(retry);
        }
        if let Some(time_limiter) = self.time_limiter {
            pipeline_builder = pipeline_builder.time_limiter(time_limiter);
        }

        Client {
            context: Arc::new(RequestContext::new(self.base_url, self.default_headers)),
            pipeline: Arc::new(pipeline_builder.build(transport)),
            cache_registry: Arc::new(self.cache_registry),
            default_table: self.default_table,
        }
    }
}

/// A resilient, optionally caching JSON HTTP client.
#[derive(Clone)]
pub struct Client {
    context: Arc<RequestContext>,
    pipeline: Arc<Pipeline>,
    cache_registry: Arc<CacheRegistry>,
    default_table: String,
}

impl Client {
    /// Creates a builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Issues a plain (non-JSON, non-cached) request. Caching never
    /// applies here, even if the caller configured a cache registry --
    /// this is this crate's documented limitation (spec §9).
    pub async fn fetch(&self, target: &str, options: RequestOptions) -> Result<Response, ClientError> {
        let method = options.method.clone().unwrap_or(Method::GET);
        let url = self.context.resolve_url(target)?;
        let headers = merge_headers(
            &options.headers,
            self.context.default_headers(),
            &self.context.default_headers_for_method(&method),
        );

        let mut request = Request::new(method, url);
        request.headers = headers;
        request.body = options.body;

        let response = self.execute(request).await?;
        reject_error_status(response, options.skip_fail_on_error_code)
    }

    /// Issues a JSON request, optionally dispatched through the caching
    /// coordinator (spec §4.2).
    pub async fn fetch_json(
        &self,
        target: &str,
        options: RequestOptions,
        cache: Option<CacheOptions>,
    ) -> Result<JsonResponse, ClientError> {
        let method = options.method.clone().unwrap_or(Method::GET);
        let base_url = self.context.resolve_url(target)?;

        let bypass_cache = cache.is_none()
            || cache
                .as_ref()
                .is_some_and(|c| c.key.is_empty() || cache_bypassed_by_force(&c.forced_cache_control));

        if bypass_cache {
            let outcome = self.fetch_json_outcome(&base_url, &method, &options, &ConditionalHeaders::default()).await?;
            return Ok(JsonResponse {
                value: outcome.value,
                headers: outcome.headers,
                update: None,
            });
        }

        let cache = cache.expect("checked above");
        let table = cache.table.clone().unwrap_or_else(|| self.default_table.clone());

        let resolve = rhttp_cache::resolve_backend(&self.cache_registry, cache.active_cache.as_deref(), &table);
        let backend = match cache.cache_timeout {
            Some(timeout) => tokio::time::timeout(timeout, resolve)
                .await
                .ok()
                .flatten(),
            None => resolve.await,
        };

        let Some(backend) = backend else {
            let outcome = self.fetch_json_outcome(&base_url, &method, &options, &ConditionalHeaders::default()).await?;
            return Ok(JsonResponse {
                value: outcome.value,
                headers: outcome.headers,
                update: None,
            });
        };

        let coordinator = CacheCoordinator::new(backend);
        let client = self.clone();
        let fetch_method = method.clone();
        let fetch_options = options.clone();
        let fetch_url = base_url.clone();
        let fetch = move |conditional: ConditionalHeaders| {
            let client = client.clone();
            let method = fetch_method.clone();
            let options = fetch_options.clone();
            let url = fetch_url.clone();
            async move { client.fetch_json_outcome(&url, &method, &options, &conditional).await }
        };

        let dispatched = match cache.mode {
            CacheMode::CacheControl => {
                coordinator
                    .dispatch_cache_control(
                        &cache.key,
                        cache.default_cache_control.clone(),
                        cache.forced_cache_control.clone(),
                        cache.update,
                        fetch,
                    )
                    .await?
            }
            CacheMode::FetchFirst => {
                let result = coordinator
                    .dispatch_fetch_first(&cache.key, cache.default_cache_control.clone(), cache.forced_cache_control.clone(), fetch)
                    .await?;
                DispatchOutcome { result, update: None }
            }
            CacheMode::Race => {
                coordinator
                    .dispatch_race(
                        &cache.key,
                        cache.default_cache_control.clone(),
                        cache.forced_cache_control.clone(),
                        cache.update,
                        fetch,
                    )
                    .await?
            }
        };

        Ok(JsonResponse {
            value: dispatched.result.value,
            headers: dispatched.result.headers,
            update: dispatched.update,
        })
    }

    /// Triggers every currently in-flight request's abort handle.
    pub fn abort_all(&self, reason: Option<String>) {
        self.context.abort_all(reason);
    }

    /// Marks the client closed and waits for in-flight requests per
    /// `timeout` (spec §5); see [`RequestContext::close`].
    pub async fn close(&self, timeout: Option<Duration>) {
        self.context.close(timeout).await;
    }

    /// `true` once [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.context.is_closed()
    }

    async fn fetch_json_outcome(
        &self,
        url: &Url,
        method: &Method,
        options: &RequestOptions,
        conditional: &ConditionalHeaders,
    ) -> Result<FetchOutcome, ClientError> {
        let mut caller_headers = options.headers.clone();
        if !options.skip_accept_header && !caller_headers.contains_key(http::header::ACCEPT) {
            caller_headers.insert(http::header::ACCEPT, HeaderValue::from_static("application/json"));
        }
        if let Some(etag) = &conditional.if_none_match {
            if let Ok(value) = HeaderValue::from_str(etag) {
                caller_headers.insert(http::header::IF_NONE_MATCH, value);
            }
        }
        if let Some(since) = &conditional.if_modified_since {
            if let Ok(value) = HeaderValue::from_str(since) {
                caller_headers.insert(http::header::IF_MODIFIED_SINCE, value);
            }
        }

        let headers = merge_headers(
            &caller_headers,
            self.context.default_headers(),
            &self.context.default_headers_for_method(method),
        );

        let mut request = Request::new(method.clone(), url.clone());
        request.headers = headers;
        request.body = options.body.clone();

        let response = self.execute(request).await?;

        if response.status == http::StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome {
                status: response.status,
                headers: response.headers,
                value: serde_json::Value::Null,
            });
        }

        if !response.ok() && !options.skip_fail_on_error_code {
            return Err(ClientError::HttpResponseError(HttpErrorContext {
                endpoint: url.to_string(),
                method: method.clone(),
                status: response.status,
                status_text: response.status_text.clone(),
                headers: response.headers.clone(),
            }));
        }

        if !options.skip_content_type_header_validation {
            let is_json = response
                .content_type()
                .is_some_and(|ct| ct.starts_with("application/json"));
            if !is_json {
                return Err(ClientError::ContentTypeError {
                    endpoint: url.to_string(),
                    content_type: response.content_type().map(str::to_string),
                });
            }
        }

        let value = if response.body.is_empty() {
            serde_json::Value::Null
        } else {
            response.json()?
        };

        Ok(FetchOutcome {
            status: response.status,
            headers: response.headers,
            value,
        })
    }

    async fn execute(&self, request: Request) -> Result<Response, ClientError> {
        let abort = crate::abort::AbortHandle::new();
        self.context.begin_request(abort.clone())?;
        let result = self.pipeline.execute(request, abort.clone()).await;
        self.context.end_request(&abort);
        result
    }
}

fn cache_bypassed_by_force(forced: &rhttp_cache::CacheControlRecord) -> bool {
    forced.no_store == Some(true)
        || forced
            .max_age
            .as_ref()
            .is_some_and(rhttp_cache::DurationOrBool::is_disabled)
}

fn reject_error_status(response: Response, skip_fail_on_error_code: bool) -> Result<Response, ClientError> {
    if response.ok() || skip_fail_on_error_code {
        return Ok(response);
    }
    Err(ClientError::HttpResponseError(HttpErrorContext {
        endpoint: String::new(),
        method: Method::GET,
        status: response.status,
        status_text: response.status_text.clone(),
        headers: response.headers.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Request as TransportRequest;
    use futures::future::BoxFuture;

    struct StaticTransport {
        status: http::StatusCode,
        body: &'static str,
        content_type: &'static str,
    }

    impl Transport for StaticTransport {
        fn execute<'a>(
            &'a self,
            _request: TransportRequest,
            _cancelled: BoxFuture<'a, Option<String>>,
        ) -> BoxFuture<'a, Result<Response, ClientError>> {
            let mut headers = HeaderMap::new();
            headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
            let status = self.status;
            let body = Bytes::from_static(self.body.as_bytes());
            Box::pin(async move {
                Ok(Response {
                    status,
                    status_text: String::new(),
                    headers,
                    body,
                })
            })
        }
    }

    #[tokio::test]
    async fn fetch_json_decodes_a_successful_response() {
        let transport = Arc::new(StaticTransport {
            status: http::StatusCode::OK,
            body: r#"{"ok":true}"#,
            content_type: "application/json",
        });
        let client = Client::builder().build(transport);
        let response = client
            .fetch_json("https://example.com/widgets", RequestOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(response.value, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn fetch_json_rejects_non_json_content_type() {
        let transport = Arc::new(StaticTransport {
            status: http::StatusCode::OK,
            body: "not json",
            content_type: "text/plain",
        });
        let client = Client::builder().build(transport);
        let result = client
            .fetch_json("https://example.com/widgets", RequestOptions::default(), None)
            .await;
        assert!(matches!(result, Err(ClientError::ContentTypeError { .. })));
    }

    #[tokio::test]
    async fn fetch_surfaces_http_response_errors() {
        let transport = Arc::new(StaticTransport {
            status: http::StatusCode::NOT_FOUND,
            body: "",
            content_type: "text/plain",
        });
        let client = Client::builder().build(transport);
        let result = client.fetch("https://example.com/widgets", RequestOptions::default()).await;
        assert!(matches!(result, Err(ClientError::HttpResponseError(_))));
    }

    #[tokio::test]
    async fn skip_fail_on_error_code_returns_the_response_as_is() {
        let transport = Arc::new(StaticTransport {
            status: http::StatusCode::NOT_FOUND,
            body: "",
            content_type: "text/plain",
        });
        let client = Client::builder().build(transport);
        let options = RequestOptions {
            skip_fail_on_error_code: true,
            ..Default::default()
        };
        let result = client.fetch("https://example.com/widgets", options).await.unwrap();
        assert_eq!(result.status, http::StatusCode::NOT_FOUND);
    }
}
