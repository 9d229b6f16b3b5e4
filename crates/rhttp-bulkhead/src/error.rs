//! Error type for the bulkhead.

use std::fmt;

/// Errors produced by [`crate::Bulkhead::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkheadError {
    /// Every running slot is taken and the FIFO queue is already at
    /// `max_queued_requests`.
    QueueFull {
        /// Calls currently running.
        concurrent_calls: usize,
        /// Configured concurrency limit.
        max_concurrent_calls: usize,
    },
    /// The waiter was cancelled while queued.
    Cancelled,
}

impl fmt::Display for BulkheadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkheadError::QueueFull {
                concurrent_calls,
                max_concurrent_calls,
            } => write!(
                f,
                "bulkhead queue full ({} running, max {})",
                concurrent_calls, max_concurrent_calls
            ),
            BulkheadError::Cancelled => write!(f, "bulkhead wait cancelled"),
        }
    }
}

impl std::error::Error for BulkheadError {}
