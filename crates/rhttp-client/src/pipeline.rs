//! The fixed-order resilience pipeline (spec §3, §4.1).
//!
//! `overallDeadline ▷ retry ▷ bulkhead ▷ circuitBreaker ▷ perRequestTimeout
//! ▷ transport`. Each layer is optional; a missing layer is the identity.
//!
//! This is deliberately NOT a generic `tower::Layer`/`Service` stack. The
//! teacher's own `composition.rs` documents that `ServiceBuilder` chains of
//! three or more of these layers hit real trait-bound resolution limits;
//! the nesting here is fixed by the domain anyway (never user-reordered),
//! so an imperative scheduler is both simpler and avoids that ceiling.

use crate::abort::AbortHandle;
use crate::transport::{Request, Response, Transport};
use rhttp_bulkhead::{Bulkhead, BulkheadError};
use rhttp_circuitbreaker::{CallOutcome as CircuitOutcome, CircuitBreaker};
use rhttp_retry::{AttemptOutcome, RetryDecision, RetryPolicy};
use rhttp_core::ClientError;
use rhttp_timelimiter::TimeLimiter;
use std::sync::Arc;

/// The composed pipeline. Construct with [`PipelineBuilder`].
pub struct Pipeline {
    bulkhead: Option<Bulkhead>,
    circuit_breaker: Option<CircuitBreaker>,
    retry: Option<RetryPolicy>,
    time_limiter: TimeLimiter,
    transport: Arc<dyn Transport>,
}

/// Builds a [`Pipeline`] from whichever layers are configured.
#[derive(Default)]
pub struct PipelineBuilder {
    bulkhead: Option<Bulkhead>,
    circuit_breaker: Option<CircuitBreaker>,
    retry: Option<RetryPolicy>,
    time_limiter: Option<TimeLimiter>,
}

impl PipelineBuilder {
    /// Creates an empty builder; every layer is optional.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the bulkhead layer.
    pub fn bulkhead(mut self, bulkhead: Bulkhead) -> Self {
        self.bulkhead = Some(bulkhead);
        self
    }

    /// Installs the circuit breaker layer.
    pub fn circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Installs the retry layer.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Installs the deadline/per-request-timeout layer.
    pub fn time_limiter(mut self, time_limiter: TimeLimiter) -> Self {
        self.time_limiter = Some(time_limiter);
        self
    }

    /// Builds the pipeline around `transport`.
    pub fn build(self, transport: Arc<dyn Transport>) -> Pipeline {
        Pipeline {
            bulkhead: self.bulkhead,
            circuit_breaker: self.circuit_breaker,
            retry: self.retry,
            time_limiter: self
                .time_limiter
                .unwrap_or_else(|| TimeLimiter::new(rhttp_timelimiter::TimeLimiterConfig::builder().build())),
            transport,
        }
    }
}

impl Pipeline {
    /// Runs `request` through every configured layer, retrying as the
    /// retry policy and overall deadline permit.
    pub async fn execute(&self, request: Request, abort: AbortHandle) -> Result<Response, ClientError> {
        let deadline = self.time_limiter.start_deadline();
        let mut attempt: u32 = 1;

        loop {
            if deadline.is_expired() {
                return Err(ClientError::Timeout {
                    layer: rhttp_core::TimeoutLayer::OverallDeadline,
                });
            }

            let outcome = self.run_attempt(&request, &abort, &deadline).await;

            if let Some(breaker) = &self.circuit_breaker {
                breaker.record_outcome(&circuit_outcome(&outcome, &request));
            }

            let Some(retry) = &self.retry else {
                return outcome;
            };

            if let Err(err) = &outcome {
                if !retriable_error(err) {
                    return outcome;
                }
            }

            let retry_outcome = retry_outcome(&outcome, &request);
            let response_headers = match &outcome {
                Ok(response) => Some(response.headers.clone()),
                Err(_) => None,
            };

            match retry.decide(attempt, &retry_outcome, response_headers.as_ref(), deadline.remaining()) {
                RetryDecision::Stop => return outcome,
                RetryDecision::Retry { delay, .. } => {
                    tokio::select! {
                        biased;
                        reason = abort.wait() => return Err(ClientError::Aborted { reason }),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn run_attempt(
        &self,
        request: &Request,
        abort: &AbortHandle,
        deadline: &rhttp_timelimiter::Deadline,
    ) -> Result<Response, ClientError> {
        let permit = if let Some(bulkhead) = &self.bulkhead {
            let cancelled = async { abort.wait().await; };
            match bulkhead.admit(cancelled).await {
                Ok(permit) => Some(permit),
                Err(BulkheadError::QueueFull {
                    concurrent_calls,
                    max_concurrent_calls,
                }) => {
                    return Err(ClientError::BulkheadRejected {
                        concurrent_calls,
                        max_concurrent_calls,
                    })
                }
                Err(BulkheadError::Cancelled) => return Err(ClientError::Aborted { reason: abort.wait().await }),
            }
        } else {
            None
        };

        if let Some(breaker) = &self.circuit_breaker {
            if let Err(err) = breaker.try_acquire() {
                return Err(ClientError::BrokenCircuit { name: err.name });
            }
        }

        let attempt_request = request.clone();
        let transport = &self.transport;
        let transport_future = transport.execute(attempt_request, abort.wait_boxed());

        let result = match self.time_limiter.run_attempt(deadline, transport_future).await {
            Ok(inner) => inner,
            Err(timeout) => Err(ClientError::Timeout { layer: timeout.layer }),
        };

        drop(permit);
        result
    }
}

fn retriable_error(err: &ClientError) -> bool {
    matches!(err, ClientError::Timeout { .. } | ClientError::NetworkError { .. })
}

fn circuit_outcome(outcome: &Result<Response, ClientError>, request: &Request) -> CircuitOutcome {
    match outcome {
        Ok(response) if response.ok() => CircuitOutcome::Success,
        Ok(response) => CircuitOutcome::HttpStatus {
            status: response.status,
            method: request.method.clone(),
        },
        Err(ClientError::Timeout { .. }) => CircuitOutcome::Timeout,
        Err(ClientError::NetworkError { .. }) => CircuitOutcome::Network,
        Err(_) => CircuitOutcome::Success,
    }
}

fn retry_outcome(outcome: &Result<Response, ClientError>, request: &Request) -> AttemptOutcome {
    match outcome {
        Ok(response) if response.ok() => AttemptOutcome::Success,
        Ok(response) => AttemptOutcome::HttpStatus {
            status: response.status,
            method: request.method.clone(),
        },
        Err(ClientError::Timeout { .. }) => AttemptOutcome::Timeout,
        Err(ClientError::NetworkError { .. }) => AttemptOutcome::Network,
        Err(_) => AttemptOutcome::Success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Request as TransportRequest;
    use futures::future::BoxFuture;
    use http::{HeaderMap, Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    struct CountingTransport {
        calls: AtomicUsize,
        responses: Vec<Result<StatusCode, ()>>,
    }

    impl Transport for CountingTransport {
        fn execute<'a>(
            &'a self,
            _request: TransportRequest,
            _cancelled: BoxFuture<'a, Option<String>>,
        ) -> BoxFuture<'a, Result<Response, ClientError>> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match self.responses.get(index) {
                    Some(Ok(status)) => Ok(Response {
                        status: *status,
                        status_text: String::new(),
                        headers: HeaderMap::new(),
                        body: bytes::Bytes::new(),
                    }),
                    Some(Err(())) => Err(ClientError::NetworkError { message: "boom".into() }),
                    None => panic!("too many attempts: {index}"),
                }
            })
        }
    }

    fn request() -> Request {
        Request::new(Method::GET, Url::parse("https://example.com/x").unwrap())
    }

    #[tokio::test]
    async fn succeeds_without_any_layers_configured() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            responses: vec![Ok(StatusCode::OK)],
        });
        let pipeline = PipelineBuilder::new().build(transport);
        let result = pipeline.execute(request(), AbortHandle::new()).await;
        assert!(result.unwrap().ok());
    }

    #[tokio::test]
    async fn retries_a_retriable_failure_and_then_succeeds() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            responses: vec![Ok(StatusCode::SERVICE_UNAVAILABLE), Ok(StatusCode::OK)],
        });
        let retry = RetryPolicy::new(
            rhttp_retry::RetryConfig::builder()
                .max_retries(2)
                .initial_delay(std::time::Duration::from_millis(1))
                .build(),
        );
        let pipeline = PipelineBuilder::new().retry(retry).build(transport);
        let result = pipeline.execute(request(), AbortHandle::new()).await;
        assert!(result.unwrap().ok());
    }

    #[tokio::test]
    async fn broken_circuit_short_circuits_before_the_transport() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            responses: vec![],
        });
        let breaker = CircuitBreaker::new(
            rhttp_circuitbreaker::CircuitBreakerConfig::builder()
                .open_after_failed_attempts(1)
                .build(),
        );
        breaker.record_outcome(&CircuitOutcome::HttpStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            method: Method::GET,
        });

        let pipeline = PipelineBuilder::new().circuit_breaker(breaker).build(transport);
        let result = pipeline.execute(request(), AbortHandle::new()).await;
        assert!(matches!(result, Err(ClientError::BrokenCircuit { .. })));
    }
}
