//! The unified error type returned by the resilience pipeline and the
//! caching coordinator.
//!
//! Unlike the teacher's `ResilienceError<E>`, this type is not generic over
//! an application error: every caller of this crate ultimately wants either
//! an HTTP [`Response`](http::Response) or a decoded JSON value, so there is
//! no user service error left to wrap.

use http::{HeaderMap, Method, StatusCode};
use std::fmt;

/// Context carried by an [`ClientError::HttpResponseError`].
#[derive(Debug, Clone)]
pub struct HttpErrorContext {
    /// The request URL or target identifier.
    pub endpoint: String,
    /// The HTTP method used.
    pub method: Method,
    /// The response status.
    pub status: StatusCode,
    /// The response's reason phrase, if the transport supplied one.
    pub status_text: String,
    /// The response headers.
    pub headers: HeaderMap,
}

/// Unified error type for the rhttp resilience pipeline and cache coordinator.
///
/// See spec §7 for the discriminant table this enum implements.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Transport returned `status >= 400` and `skip_fail_on_error_code` was off.
    HttpResponseError(HttpErrorContext),

    /// A JSON request received a non-JSON `Content-Type`.
    ContentTypeError {
        /// The endpoint that returned the unexpected content type.
        endpoint: String,
        /// The `Content-Type` header value received, if any.
        content_type: Option<String>,
    },

    /// The per-request timeout or the overall deadline fired.
    Timeout {
        /// Which timer fired.
        layer: TimeoutLayer,
    },

    /// The bulkhead's queue capacity was exceeded.
    BulkheadRejected {
        /// Number of calls currently running.
        concurrent_calls: usize,
        /// Configured maximum concurrent calls.
        max_concurrent_calls: usize,
    },

    /// The circuit breaker is open; the call was rejected without reaching
    /// the transport.
    BrokenCircuit {
        /// Circuit breaker name, if configured.
        name: Option<String>,
    },

    /// The caller's abort handle fired.
    Aborted {
        /// The caller-supplied abort reason, if any.
        reason: Option<String>,
    },

    /// A transport-level network failure (not an HTTP response).
    NetworkError {
        /// A human-readable description of the network failure.
        message: String,
    },

    /// Non-fatal signal carried only on the `update` channel — never
    /// returned from the primary result.
    NoUpdate(NoUpdateReason),

    /// A request was issued after the owning context was closed.
    ClientClosed,
}

/// Which timer produced a [`ClientError::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutLayer {
    /// The per-attempt `timeoutRequest` timer.
    PerRequest,
    /// The whole-call `timeoutTotal` deadline.
    OverallDeadline,
}

/// Why the `update` channel resolved without a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoUpdateReason {
    /// The initial lookup was already fresh.
    FreshCache,
    /// Caching was disabled for this request.
    CacheDisabled,
    /// The revalidation request returned `304 Not Modified`.
    Unchanged,
    /// There was no cached entry to compare against.
    NoCached,
    /// The background/raced fetch returned a value equal to the cached one.
    Equal,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::HttpResponseError(ctx) => write!(
                f,
                "HTTP {} {} -> {} {}",
                ctx.method, ctx.endpoint, ctx.status, ctx.status_text
            ),
            ClientError::ContentTypeError {
                endpoint,
                content_type,
            } => write!(
                f,
                "unexpected content-type {:?} from {}",
                content_type, endpoint
            ),
            ClientError::Timeout {
                layer: TimeoutLayer::PerRequest,
            } => write!(f, "per-request timeout"),
            ClientError::Timeout {
                layer: TimeoutLayer::OverallDeadline,
            } => write!(f, "overall deadline exceeded"),
            ClientError::BulkheadRejected {
                concurrent_calls,
                max_concurrent_calls,
            } => write!(
                f,
                "bulkhead full ({}/{})",
                concurrent_calls, max_concurrent_calls
            ),
            ClientError::BrokenCircuit { name } => match name {
                Some(n) => write!(f, "circuit breaker '{}' is open", n),
                None => write!(f, "circuit breaker is open"),
            },
            ClientError::Aborted { reason } => match reason {
                Some(r) => write!(f, "aborted: {}", r),
                None => write!(f, "aborted"),
            },
            ClientError::NetworkError { message } => write!(f, "network error: {}", message),
            ClientError::NoUpdate(reason) => write!(f, "no update: {:?}", reason),
            ClientError::ClientClosed => write!(f, "client is closed"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Returns `true` if this is a timeout error (either layer).
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    /// Returns `true` if this is a circuit-open rejection.
    pub fn is_broken_circuit(&self) -> bool {
        matches!(self, ClientError::BrokenCircuit { .. })
    }

    /// Returns `true` if this is a bulkhead rejection.
    pub fn is_bulkhead_rejected(&self) -> bool {
        matches!(self, ClientError::BulkheadRejected { .. })
    }

    /// Returns `true` if this is a network-level error.
    pub fn is_network_error(&self) -> bool {
        matches!(self, ClientError::NetworkError { .. })
    }

    /// Returns `true` if this is an HTTP response error, and whether its
    /// status is in the retriable default set `{408, 420, 429, 500, 502,
    /// 503, 504}`.
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            ClientError::HttpResponseError(ctx) => Some(ctx.status),
            _ => None,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    const _: () = {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<ClientError>();
    };

    #[test]
    fn display_includes_status_for_http_errors() {
        let err = ClientError::HttpResponseError(HttpErrorContext {
            endpoint: "https://example.com".to_string(),
            method: Method::GET,
            status: StatusCode::SERVICE_UNAVAILABLE,
            status_text: "Service Unavailable".to_string(),
            headers: HeaderMap::new(),
        });
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn predicates_match_their_variant() {
        let err = ClientError::BrokenCircuit { name: None };
        assert!(err.is_broken_circuit());
        assert!(!err.is_timeout());
    }
}
