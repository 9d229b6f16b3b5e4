//! Cancellation propagation (spec §4.1.6, §5).
//!
//! Every request owns an [`AbortHandle`] derived from the caller's (which
//! may be empty). Firing it unwinds every downstream suspension point —
//! queue waits, backoff sleeps, the in-flight transport call — in one
//! shot.

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct Inner {
    notify: Notify,
    reason: Mutex<Option<Option<String>>>,
}

/// A cooperative, multi-waiter cancellation signal carrying an optional
/// reason.
#[derive(Clone)]
pub struct AbortHandle(Arc<Inner>);

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortHandle {
    /// Creates a new, unfired handle.
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            notify: Notify::new(),
            reason: Mutex::new(None),
        }))
    }

    /// Fires the handle, waking every current and future waiter. A handle
    /// can only be fired once; later calls are no-ops.
    pub fn fire(&self, reason: Option<String>) {
        let mut guard = self.0.reason.lock().unwrap();
        if guard.is_none() {
            *guard = Some(reason);
            self.0.notify.notify_waiters();
        }
    }

    /// `true` if [`Self::fire`] has already been called.
    pub fn is_fired(&self) -> bool {
        self.0.reason.lock().unwrap().is_some()
    }

    /// Resolves once this handle fires, yielding the reason it fired with.
    pub async fn wait(&self) -> Option<String> {
        loop {
            if let Some(reason) = self.0.reason.lock().unwrap().clone() {
                return reason;
            }
            let notified = self.0.notify.notified();
            // Re-check after subscribing to close the race between the
            // initial check and `notified()` registering its waker.
            if let Some(reason) = self.0.reason.lock().unwrap().clone() {
                return reason;
            }
            notified.await;
        }
    }

    /// A boxed, borrowed future equivalent to [`Self::wait`], for passing
    /// to [`crate::Transport::execute`].
    pub fn wait_boxed(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(self.wait())
    }
}

/// Resolves when any handle in `handles` fires, yielding the first
/// non-empty reason encountered (or `None` if the first to fire carried
/// none).
pub async fn race(handles: &[AbortHandle]) -> Option<String> {
    if handles.is_empty() {
        std::future::pending::<()>().await;
        unreachable!("pending future never resolves");
    }
    let futures = handles.iter().map(AbortHandle::wait);
    let (reason, ..) = futures::future::select_all(futures.map(Box::pin)).await;
    reason
}
