//! The time-limiter layer: per-request timeout plus overall deadline.

use crate::config::TimeLimiterConfig;
use crate::deadline::Deadline;
use crate::error::TimeLimiterError;
use crate::events::TimeLimiterEvent;
use rhttp_core::error::TimeoutLayer;
use std::future::Future;
use std::time::Instant;

/// Bounds a single transport attempt by the shorter of the per-request
/// timeout and whatever remains of the overall deadline.
pub struct TimeLimiter {
    config: TimeLimiterConfig,
}

impl TimeLimiter {
    /// Creates a new time-limiter.
    pub fn new(config: TimeLimiterConfig) -> Self {
        Self { config }
    }

    /// Starts a new [`Deadline`] using this layer's `overall_deadline`
    /// configuration. Call once per logical request, not per attempt.
    pub fn start_deadline(&self) -> Deadline {
        Deadline::start(self.config.overall_deadline)
    }

    /// Runs `fut`, aborting it if either the per-request timer or the
    /// remaining budget on `deadline` elapses first.
    ///
    /// Returns `Err` naming whichever layer fired. If the overall deadline
    /// has already elapsed before `fut` starts, it fires without polling
    /// `fut` at all.
    pub async fn run_attempt<F, T>(&self, deadline: &Deadline, fut: F) -> Result<T, TimeLimiterError>
    where
        F: Future<Output = T>,
    {
        let overall_remaining = deadline.remaining();
        if matches!(overall_remaining, Some(remaining) if remaining.is_zero()) {
            self.emit_timeout(TimeoutLayer::OverallDeadline);
            return Err(TimeLimiterError {
                layer: TimeoutLayer::OverallDeadline,
            });
        }

        let effective_timeout = match (self.config.per_request_timeout, overall_remaining) {
            (Some(per_request), Some(overall)) => Some(per_request.min(overall)),
            (Some(per_request), None) => Some(per_request),
            (None, Some(overall)) => Some(overall),
            (None, None) => None,
        };

        let layer_on_elapse = match (self.config.per_request_timeout, overall_remaining) {
            (Some(per_request), Some(overall)) if overall <= per_request => {
                TimeoutLayer::OverallDeadline
            }
            (Some(_), _) => TimeoutLayer::PerRequest,
            (None, _) => TimeoutLayer::OverallDeadline,
        };

        let Some(timeout) = effective_timeout else {
            return Ok(fut.await);
        };

        match tokio::time::timeout(timeout, fut).await {
            Ok(value) => Ok(value),
            Err(_) => {
                self.emit_timeout(layer_on_elapse);
                Err(TimeLimiterError {
                    layer: layer_on_elapse,
                })
            }
        }
    }

    fn emit_timeout(&self, layer: TimeoutLayer) {
        self.config.event_listeners.emit(&TimeLimiterEvent::TimedOut {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            layer,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn per_request_timeout_fires_before_overall_deadline() {
        let limiter = TimeLimiter::new(
            TimeLimiterConfig::builder()
                .per_request_timeout(Duration::from_millis(50))
                .overall_deadline(Duration::from_secs(10))
                .build(),
        );
        let deadline = limiter.start_deadline();

        let result = limiter
            .run_attempt(&deadline, tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(
            result.unwrap_err(),
            TimeLimiterError {
                layer: TimeoutLayer::PerRequest
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_fires_when_it_is_the_tighter_bound() {
        let limiter = TimeLimiter::new(
            TimeLimiterConfig::builder()
                .per_request_timeout(Duration::from_secs(30))
                .overall_deadline(Duration::from_millis(50))
                .build(),
        );
        let deadline = limiter.start_deadline();

        let result = limiter
            .run_attempt(&deadline, tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(
            result.unwrap_err(),
            TimeLimiterError {
                layer: TimeoutLayer::OverallDeadline
            }
        );
    }

    #[tokio::test]
    async fn successful_attempt_within_budget_returns_ok() {
        let limiter = TimeLimiter::new(
            TimeLimiterConfig::builder()
                .per_request_timeout(Duration::from_secs(5))
                .build(),
        );
        let deadline = limiter.start_deadline();

        let result = limiter.run_attempt(&deadline, async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn unconfigured_limiter_never_times_out() {
        let limiter = TimeLimiter::new(TimeLimiterConfig::builder().build());
        let deadline = limiter.start_deadline();
        let result = limiter.run_attempt(&deadline, async { "ok" }).await;
        assert_eq!(result.unwrap(), "ok");
    }
}
