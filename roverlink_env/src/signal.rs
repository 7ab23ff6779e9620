//! Cancellation signals shared between callers and in-flight operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortState {
    flag: AtomicBool,
    notify: Notify,
}

/// Read side of a cancellation flag.
///
/// Cloning is cheap; all clones observe the same controller.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    state: Arc<AbortState>,
}

impl AbortSignal {
    /// A signal that is never raised (no controller holds it).
    pub fn never() -> Self {
        Self::default()
    }

    /// Returns true once the owning controller has aborted.
    pub fn is_aborted(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }

    /// Resolves when the signal is raised.
    pub async fn aborted(&self) {
        loop {
            // Register before checking the flag so a concurrent abort is not missed.
            let notified = self.state.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// Owner of an [`AbortSignal`].
#[derive(Clone, Debug, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Creates a controller with a fresh, un-raised signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Raises the signal and wakes every waiter. Idempotent.
    pub fn abort(&self) {
        self.signal.state.flag.store(true, Ordering::SeqCst);
        self.signal.state.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }
}
