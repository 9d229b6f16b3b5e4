//! Bulkhead admission control.

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::BulkheadEvent;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// A fixed-capacity admission gate with a bounded FIFO queue.
///
/// `max_parallel_requests` calls may run at once; once that's exhausted,
/// up to `max_queued_requests` additional callers wait for a slot. Beyond
/// that, [`Bulkhead::admit`] fails immediately with
/// [`BulkheadError::QueueFull`].
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    config: Arc<BulkheadConfig>,
}

/// A held admission slot. Dropping it releases the slot and emits
/// `CallFinished`.
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
    config: Arc<BulkheadConfig>,
    started_at: Instant,
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        let duration = self.started_at.elapsed();
        let event = BulkheadEvent::CallFinished {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_finished_total", "bulkhead" => self.config.name.clone())
                .increment(1);
            let concurrent = self.config.max_parallel_requests - self.semaphore.available_permits();
            gauge!("bulkhead_concurrent_calls", "bulkhead" => self.config.name.clone())
                .set(concurrent as f64);
        }
    }
}

impl Bulkhead {
    /// Creates a new bulkhead from the given configuration.
    pub fn new(config: BulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_requests));
        Self {
            semaphore,
            queued: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }

    /// Attempts to admit a call.
    ///
    /// `cancelled` resolves if the caller's abort fires while this call is
    /// queued; on that event the waiter is dequeued promptly and
    /// [`BulkheadError::Cancelled`] is returned.
    pub async fn admit<C>(&self, cancelled: C) -> Result<BulkheadPermit, BulkheadError>
    where
        C: Future<Output = ()> + Send,
    {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(self.finish_admission(permit));
        }

        if self.queued.load(Ordering::SeqCst) >= self.config.max_queued_requests {
            let event = BulkheadEvent::CallRejected {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                max_concurrent_calls: self.config.max_parallel_requests,
            };
            self.config.event_listeners.emit(&event);

            #[cfg(feature = "metrics")]
            counter!("bulkhead_calls_rejected_total", "bulkhead" => self.config.name.clone())
                .increment(1);

            return Err(BulkheadError::QueueFull {
                concurrent_calls: self.config.max_parallel_requests,
                max_concurrent_calls: self.config.max_parallel_requests,
            });
        }

        self.queued.fetch_add(1, Ordering::SeqCst);
        let acquire = Arc::clone(&self.semaphore).acquire_owned();
        tokio::pin!(acquire);
        tokio::pin!(cancelled);

        let outcome = tokio::select! {
            biased;
            permit = &mut acquire => Ok(permit),
            _ = &mut cancelled => Err(()),
        };
        self.queued.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(Ok(permit)) => Ok(self.finish_admission(permit)),
            Ok(Err(_closed)) => Err(BulkheadError::QueueFull {
                concurrent_calls: self.config.max_parallel_requests,
                max_concurrent_calls: self.config.max_parallel_requests,
            }),
            Err(()) => {
                let event = BulkheadEvent::CallCancelledWhileQueued {
                    pattern_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                };
                self.config.event_listeners.emit(&event);
                Err(BulkheadError::Cancelled)
            }
        }
    }

    fn finish_admission(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        let concurrent_calls = self.config.max_parallel_requests - self.semaphore.available_permits();
        let event = BulkheadEvent::CallPermitted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            concurrent_calls,
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            counter!("bulkhead_calls_permitted_total", "bulkhead" => self.config.name.clone())
                .increment(1);
            gauge!("bulkhead_concurrent_calls", "bulkhead" => self.config.name.clone())
                .set(concurrent_calls as f64);
        }

        BulkheadPermit {
            _permit: permit,
            semaphore: Arc::clone(&self.semaphore),
            config: Arc::clone(&self.config),
            started_at: Instant::now(),
        }
    }

    /// Number of calls currently running.
    pub fn concurrent_calls(&self) -> usize {
        self.config.max_parallel_requests - self.semaphore.available_permits()
    }

    /// Number of calls currently queued, waiting for a slot.
    pub fn queued_calls(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BulkheadConfig;
    use std::future::pending;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn admits_up_to_capacity() {
        let bulkhead = Bulkhead::new(BulkheadConfig::builder().max_parallel_requests(2).build());

        let p1 = bulkhead.admit(pending::<()>()).await.unwrap();
        let p2 = bulkhead.admit(pending::<()>()).await.unwrap();
        assert_eq!(bulkhead.concurrent_calls(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn rejects_when_queue_full() {
        let bulkhead = Bulkhead::new(
            BulkheadConfig::builder()
                .max_parallel_requests(1)
                .max_queued_requests(0)
                .build(),
        );

        let _p1 = bulkhead.admit(pending::<()>()).await.unwrap();
        let err = bulkhead.admit(pending::<()>()).await.unwrap_err();
        assert!(matches!(err, BulkheadError::QueueFull { .. }));
    }

    #[tokio::test]
    async fn queued_waiter_is_admitted_when_slot_frees() {
        let bulkhead = Arc::new(Bulkhead::new(
            BulkheadConfig::builder()
                .max_parallel_requests(1)
                .max_queued_requests(1)
                .build(),
        ));

        let p1 = bulkhead.admit(pending::<()>()).await.unwrap();

        let waiter_bulkhead = Arc::clone(&bulkhead);
        let waiter = tokio::spawn(async move { waiter_bulkhead.admit(pending::<()>()).await });

        tokio::task::yield_now().await;
        assert_eq!(bulkhead.queued_calls(), 1);

        drop(p1);
        let permit = waiter.await.unwrap().unwrap();
        assert_eq!(bulkhead.concurrent_calls(), 1);
        drop(permit);
    }

    #[tokio::test]
    async fn cancellation_dequeues_promptly() {
        let bulkhead = Arc::new(Bulkhead::new(
            BulkheadConfig::builder()
                .max_parallel_requests(1)
                .max_queued_requests(1)
                .build(),
        ));

        let _p1 = bulkhead.admit(pending::<()>()).await.unwrap();

        let notify = Arc::new(Notify::new());
        let notify_clone = Arc::clone(&notify);
        let waiter_bulkhead = Arc::clone(&bulkhead);
        let waiter = tokio::spawn(async move {
            waiter_bulkhead
                .admit(async move { notify_clone.notified().await })
                .await
        });

        tokio::task::yield_now().await;
        assert_eq!(bulkhead.queued_calls(), 1);

        notify.notify_one();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(BulkheadError::Cancelled)));
        assert_eq!(bulkhead.queued_calls(), 0);
    }

    #[tokio::test]
    async fn call_permitted_event_fires() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let bulkhead = Bulkhead::new(
            BulkheadConfig::builder()
                .max_parallel_requests(2)
                .on_call_permitted(move |_| {
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        );

        let _permit = bulkhead.admit(pending::<()>()).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
