//! Failure classification for the circuit breaker (spec §4.1.3).

use http::{Method, StatusCode};
use std::collections::HashSet;

/// The outcome of a single transport attempt, as reported to the circuit
/// breaker after the attempt completes.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// The attempt succeeded (a 2xx/3xx response, or a non-erroring
    /// skip-fail-on-error-code response).
    Success,
    /// The transport returned an HTTP error response.
    HttpStatus { status: StatusCode, method: Method },
    /// The per-request timer or the overall deadline fired.
    Timeout,
    /// A transport-level network failure.
    Network,
    /// The response failed JSON content-type validation. Never counted as
    /// a circuit-breaker failure.
    ContentType,
}

/// Default status codes counted as failures: `{408, 420, 429, 500, 502,
/// 503, 504}`.
pub fn default_status_codes() -> HashSet<StatusCode> {
    [408, 420, 429, 500, 502, 503, 504]
        .into_iter()
        .map(|code| StatusCode::from_u16(code).expect("valid status code"))
        .collect()
}

/// Classifies [`CallOutcome`]s as circuit-breaker failures per spec §4.1.3.
pub struct FailureClassifier {
    pub(crate) status_codes: HashSet<StatusCode>,
    pub(crate) methods: Option<HashSet<Method>>,
    pub(crate) trigger_on_timeout: bool,
    pub(crate) trigger_on_network_error: bool,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self {
            status_codes: default_status_codes(),
            methods: None,
            trigger_on_timeout: true,
            trigger_on_network_error: true,
        }
    }
}

impl FailureClassifier {
    /// Returns `true` if `outcome` counts as a circuit-breaker failure.
    pub fn is_failure(&self, outcome: &CallOutcome) -> bool {
        match outcome {
            CallOutcome::Success | CallOutcome::ContentType => false,
            CallOutcome::HttpStatus { status, method } => {
                self.status_codes.contains(status)
                    && match &self.methods {
                        Some(methods) => methods.contains(method),
                        None => true,
                    }
            }
            CallOutcome::Timeout => self.trigger_on_timeout,
            CallOutcome::Network => self.trigger_on_network_error,
        }
    }
}
