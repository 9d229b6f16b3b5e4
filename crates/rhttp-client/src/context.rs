//! Request context: default headers, base URL, and close lifecycle (spec
//! §2 "Request context", §5).

use crate::abort::AbortHandle;
use http::{HeaderMap, Method};
use rhttp_core::ClientError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Shared, per-client state: default headers, base URL resolution, and
/// the set of currently in-flight requests' abort handles.
pub struct RequestContext {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    default_headers_by_method: HashMap<Method, HeaderMap>,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    abort_handles: Mutex<Vec<AbortHandle>>,
}

impl RequestContext {
    /// Creates a new context. `base_url`, if given, is joined against
    /// relative targets passed to requests.
    pub fn new(base_url: Option<Url>, default_headers: HeaderMap) -> Self {
        Self {
            base_url,
            default_headers,
            default_headers_by_method: HashMap::new(),
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            abort_handles: Mutex::new(Vec::new()),
        }
    }

    /// Registers per-method default headers, merged with precedence over
    /// `default_headers` but under caller-supplied headers (§4.1.7).
    pub fn set_default_headers_for_method(&mut self, method: Method, headers: HeaderMap) {
        self.default_headers_by_method.insert(method, headers);
    }

    /// Resolves `target` against the configured base URL.
    pub fn resolve_url(&self, target: &str) -> Result<Url, ClientError> {
        match Url::parse(target) {
            Ok(url) => Ok(url),
            Err(_) => match &self.base_url {
                Some(base) => base.join(target).map_err(|e| ClientError::NetworkError {
                    message: format!("invalid request target {target:?}: {e}"),
                }),
                None => Err(ClientError::NetworkError {
                    message: format!("relative target {target:?} with no base URL configured"),
                }),
            },
        }
    }

    /// The general (not per-method) default headers.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// The default headers registered for `method`, if any.
    pub fn default_headers_for_method(&self, method: &Method) -> HeaderMap {
        self.default_headers_by_method.get(method).cloned().unwrap_or_default()
    }

    /// Registers a new request's abort handle and marks it in-flight.
    /// Returns `Err(ClientError::ClientClosed)` if the context has already
    /// started closing.
    pub fn begin_request(&self, handle: AbortHandle) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ClientClosed);
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.abort_handles.lock().unwrap().push(handle);
        Ok(())
    }

    /// Marks one request as finished and drops its abort handle.
    pub fn end_request(&self, handle: &AbortHandle) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.abort_handles.lock().unwrap().retain(|h| !std::ptr::eq(h, handle) && !h.is_fired());
    }

    /// Fires every currently owned abort handle with `reason`.
    pub fn abort_all(&self, reason: Option<String>) {
        for handle in self.abort_handles.lock().unwrap().iter() {
            handle.fire(reason.clone());
        }
    }

    /// Marks the context closed; subsequent [`Self::begin_request`] calls
    /// fail with [`ClientError::ClientClosed`].
    ///
    /// `timeout`: `None` waits indefinitely for outstanding requests to
    /// finish; `Some(Duration::ZERO)` aborts immediately; any other value
    /// waits up to that long, then aborts whatever remains. Polls at a
    /// 50 ms tick, matching the acceptable granularity in spec §5.
    pub async fn close(&self, timeout: Option<Duration>) {
        self.closed.store(true, Ordering::SeqCst);

        if timeout == Some(Duration::ZERO) {
            self.abort_all(Some("client closed".to_string()));
            return;
        }

        let deadline = timeout.map(|d| tokio::time::Instant::now() + d);
        loop {
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    self.abort_all(Some("client closed".to_string()));
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// `true` once [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_targets_against_the_base_url() {
        let context = RequestContext::new(Some(Url::parse("https://api.example.com/v1/").unwrap()), HeaderMap::new());
        let resolved = context.resolve_url("widgets").unwrap();
        assert_eq!(resolved.as_str(), "https://api.example.com/v1/widgets");
    }

    #[test]
    fn absolute_targets_are_used_as_is() {
        let context = RequestContext::new(None, HeaderMap::new());
        let resolved = context.resolve_url("https://other.example.com/x").unwrap();
        assert_eq!(resolved.as_str(), "https://other.example.com/x");
    }

    #[tokio::test]
    async fn close_rejects_new_requests() {
        let context = RequestContext::new(None, HeaderMap::new());
        context.close(Some(Duration::ZERO)).await;
        assert!(context.begin_request(AbortHandle::new()).is_err());
    }
}
