//! Shared mock transport for the integration tests.

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderMap, HeaderValue, StatusCode};
use rhttp_client::{Request, Response, Transport};
use rhttp_core::ClientError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted response a [`MockTransport`] hands back, in order.
#[derive(Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub delay: Option<Duration>,
}

/// A scripted raw-text response.
pub fn text_response(status: u16, body: &str) -> MockResponse {
    MockResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: HeaderMap::new(),
        body: Bytes::copy_from_slice(body.as_bytes()),
        delay: None,
    }
}

/// A scripted JSON response with `Content-Type: application/json` set.
pub fn json_response(status: u16, value: serde_json::Value) -> MockResponse {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    MockResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::from(serde_json::to_vec(&value).unwrap()),
        delay: None,
    }
}

impl MockResponse {
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers
            .insert(http::header::HeaderName::from_static(name), HeaderValue::from_str(value).unwrap());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A [`Transport`] that plays back a fixed script of [`MockResponse`]s, one
/// per call, in order. Also tracks concurrently in-flight calls for
/// bulkhead tests.
pub struct MockTransport {
    calls: AtomicUsize,
    responses: Mutex<Vec<MockResponse>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            responses: Mutex::new(responses),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn execute<'a>(
        &'a self,
        _request: Request,
        cancelled: BoxFuture<'a, Option<String>>,
    ) -> BoxFuture<'a, Result<Response, ClientError>> {
        Box::pin(async move {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let mock = self
                .responses
                .lock()
                .unwrap()
                .get(index)
                .cloned()
                .unwrap_or_else(|| panic!("no scripted response for attempt {index}"));

            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

            if let Some(delay) = mock.delay {
                tokio::select! {
                    biased;
                    reason = cancelled => {
                        self.in_flight.fetch_sub(1, Ordering::SeqCst);
                        return Err(ClientError::Aborted { reason });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(Response {
                status: mock.status,
                status_text: String::new(),
                headers: mock.headers,
                body: mock.body,
            })
        })
    }
}
