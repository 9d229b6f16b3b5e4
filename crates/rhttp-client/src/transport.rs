//! The transport contract (spec §6) the resilience pipeline drives.

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, Method, StatusCode};
use rhttp_core::ClientError;
use url::Url;

/// A single HTTP exchange to be issued by a [`Transport`].
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,
    /// The absolute target URL.
    pub url: Url,
    /// Request headers, after default-header merge (§4.1.7).
    pub headers: HeaderMap,
    /// The request body, if any. Cloned independently on every retry
    /// attempt (§4.1.5) since `Bytes` is cheaply shareable.
    pub body: Option<Bytes>,
}

impl Request {
    /// Creates a new request with no body and no headers.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A transport response.
#[derive(Debug, Clone)]
pub struct Response {
    /// The response status.
    pub status: StatusCode,
    /// The response's reason phrase.
    pub status_text: String,
    /// Response headers (case-insensitive multi-map).
    pub headers: HeaderMap,
    /// The raw response body.
    pub body: Bytes,
}

impl Response {
    /// `true` iff `status < 400`.
    pub fn ok(&self) -> bool {
        self.status.as_u16() < 400
    }

    /// Decodes the body as UTF-8 text.
    pub fn text(&self) -> Result<String, ClientError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| ClientError::NetworkError {
            message: format!("response body is not valid UTF-8: {e}"),
        })
    }

    /// Decodes the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::NetworkError {
            message: format!("response body is not valid JSON: {e}"),
        })
    }

    /// The response's `Content-Type`, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Issues one HTTP exchange. Implementors own connection pooling, TLS, and
/// wire-level framing; none of that is this crate's concern (spec §1).
pub trait Transport: Send + Sync {
    /// Executes `request`, honoring cancellation via `cancelled`.
    ///
    /// `cancelled` resolves when the caller's abort handle or a timer
    /// upstream fires; implementations should race it against the
    /// underlying I/O and return [`ClientError::Aborted`] if it wins.
    fn execute<'a>(
        &'a self,
        request: Request,
        cancelled: BoxFuture<'a, Option<String>>,
    ) -> BoxFuture<'a, Result<Response, ClientError>>;
}

#[cfg(feature = "reqwest-transport")]
mod reqwest_transport {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;

    /// The default [`Transport`], backed by [`reqwest::Client`].
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Wraps an existing [`reqwest::Client`].
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Default for ReqwestTransport {
        fn default() -> Self {
            Self::new(reqwest::Client::new())
        }
    }

    impl Transport for ReqwestTransport {
        fn execute<'a>(
            &'a self,
            request: Request,
            cancelled: BoxFuture<'a, Option<String>>,
        ) -> BoxFuture<'a, Result<Response, ClientError>> {
            Box::pin(async move {
                let mut builder = self.client.request(request.method, request.url);
                builder = builder.headers(request.headers);
                if let Some(body) = request.body {
                    builder = builder.body(body);
                }

                let send = builder.send();
                tokio::pin!(send);
                let cancelled: Pin<Box<dyn Future<Output = Option<String>> + Send>> = cancelled;
                tokio::pin!(cancelled);

                tokio::select! {
                    biased;
                    reason = &mut cancelled => {
                        return Err(ClientError::Aborted { reason });
                    }
                    result = &mut send => {
                        let response = result.map_err(|e| ClientError::NetworkError { message: e.to_string() })?;
                        let status = response.status();
                        let status_text = status.canonical_reason().unwrap_or("").to_string();
                        let headers = response.headers().clone();
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| ClientError::NetworkError { message: e.to_string() })?;
                        Ok(Response { status, status_text, headers, body })
                    }
                }
            })
        }
    }
}

#[cfg(feature = "reqwest-transport")]
pub use reqwest_transport::ReqwestTransport;
