//! Bulkhead observability events.

use rhttp_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted by [`crate::Bulkhead`].
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call was admitted (a slot was free, possibly after queueing).
    CallPermitted {
        /// Bulkhead instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// Calls running immediately after admission.
        concurrent_calls: usize,
    },
    /// A call was rejected because the queue was already full.
    CallRejected {
        /// Bulkhead instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// Configured concurrency limit.
        max_concurrent_calls: usize,
    },
    /// A queued call was cancelled before a slot became available.
    CallCancelledWhileQueued {
        /// Bulkhead instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
    },
    /// A call released its slot.
    CallFinished {
        /// Bulkhead instance name.
        pattern_name: String,
        /// Event timestamp.
        timestamp: Instant,
        /// How long the slot was held.
        duration: Duration,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::CallCancelledWhileQueued { .. } => "call_cancelled_while_queued",
            BulkheadEvent::CallFinished { .. } => "call_finished",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { timestamp, .. }
            | BulkheadEvent::CallRejected { timestamp, .. }
            | BulkheadEvent::CallCancelledWhileQueued { timestamp, .. }
            | BulkheadEvent::CallFinished { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BulkheadEvent::CallPermitted { pattern_name, .. }
            | BulkheadEvent::CallRejected { pattern_name, .. }
            | BulkheadEvent::CallCancelledWhileQueued { pattern_name, .. }
            | BulkheadEvent::CallFinished { pattern_name, .. } => pattern_name,
        }
    }
}
