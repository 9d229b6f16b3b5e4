//! Retriability predicate (spec §4.1.4).

use http::{Method, StatusCode};
use std::collections::HashSet;

/// The outcome of a single attempt, as reported to the retry policy.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The attempt succeeded.
    Success,
    /// The transport returned an HTTP error response.
    HttpStatus { status: StatusCode, method: Method },
    /// The per-request timer or the overall deadline fired.
    Timeout,
    /// A transport-level network failure.
    Network,
}

/// Default retry status codes: `{408, 420, 429, 500, 502, 503, 504}`.
pub fn default_retry_status_codes() -> HashSet<StatusCode> {
    [408, 420, 429, 500, 502, 503, 504]
        .into_iter()
        .map(|code| StatusCode::from_u16(code).expect("valid status code"))
        .collect()
}

/// Default retriable methods: `{GET, HEAD, PUT, DELETE, OPTIONS, TRACE}`.
/// `POST` is added only when `retry_posts` is enabled.
pub fn default_retry_methods() -> HashSet<Method> {
    [
        Method::GET,
        Method::HEAD,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
    ]
    .into_iter()
    .collect()
}

/// Decides whether an [`AttemptOutcome`] may be retried.
pub struct RetryPredicate {
    pub(crate) status_codes: HashSet<StatusCode>,
    pub(crate) methods: HashSet<Method>,
    pub(crate) retry_timeout: bool,
    pub(crate) retry_network_errors: bool,
}

impl Default for RetryPredicate {
    fn default() -> Self {
        Self {
            status_codes: default_retry_status_codes(),
            methods: default_retry_methods(),
            retry_timeout: true,
            retry_network_errors: true,
        }
    }
}

impl RetryPredicate {
    /// Returns `true` if `outcome` may be retried.
    pub fn is_retriable(&self, outcome: &AttemptOutcome) -> bool {
        match outcome {
            AttemptOutcome::Success => false,
            AttemptOutcome::HttpStatus { status, method } => {
                self.status_codes.contains(status) && self.methods.contains(method)
            }
            AttemptOutcome::Timeout => self.retry_timeout,
            AttemptOutcome::Network => self.retry_network_errors,
        }
    }
}
