//! Errors produced by the time-limiter layer.

use rhttp_core::error::TimeoutLayer;
use std::fmt;

/// Either timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimiterError {
    /// Which timer fired.
    pub layer: TimeoutLayer,
}

impl fmt::Display for TimeLimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layer {
            TimeoutLayer::PerRequest => write!(f, "per-request timeout elapsed"),
            TimeoutLayer::OverallDeadline => write!(f, "overall deadline elapsed"),
        }
    }
}

impl std::error::Error for TimeLimiterError {}
