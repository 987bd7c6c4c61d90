//! The abort controller/signal pair: a reference-counted cancellation token
//! with `addEventListener("abort", ..)` / `removeEventListener`-style
//! semantics.
//!
//! Realized over [`tokio_util::sync::CancellationToken`], a reference-counted
//! cancellation token with attach/detach of callbacks; this wrapper adds the
//! listener-handle and remove-on-settle bookkeeping a bare token does not.

use tokio_util::sync::CancellationToken;

/// Owns a cancellation token. Dropping all controllers and signals derived from
/// one does not cancel it; only an explicit `abort()` does.
#[derive(Clone, Debug)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    /// A fresh, non-aborted controller.
    pub fn new() -> Self {
        AbortController {
            token: CancellationToken::new(),
        }
    }

    /// The signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }

    /// Trigger cancellation. Idempotent: firing twice is a no-op the second time.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// `true` once `abort()` has been called.
    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle to a listener registered via [`AbortSignal::add_event_listener`];
/// drop or call [`ListenerHandle::remove`] to stop the listener from firing.
#[derive(Clone, Debug)]
pub struct ListenerHandle {
    remove: CancellationToken,
}

impl ListenerHandle {
    /// Detach the listener. Safe to call more than once.
    pub fn remove(&self) {
        self.remove.cancel();
    }
}

/// A read-only view of an [`AbortController`]'s cancellation state.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// `true` once the owning controller has aborted.
    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the owning controller aborts. Useful as a `tokio::select!` arm.
    pub async fn cancelled(&self) {
        self.token.clone().cancelled_owned().await;
    }

    /// Register `f` to run exactly once, the first time this signal aborts.
    ///
    /// Returns a handle the caller must use to detach the listener once it is
    /// no longer needed (e.g. because the operation it guards has already
    /// settled through its ordinary success path).
    pub fn add_event_listener<F>(&self, f: F) -> ListenerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let remove = CancellationToken::new();
        let signal = self.token.clone();
        let remove_watch = remove.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = signal.cancelled() => f(),
                _ = remove_watch.cancelled() => {}
            }
        });
        ListenerHandle { remove }
    }

    /// A signal that is never aborted and has no controller reachable from it.
    ///
    /// Used as the fresh, unlinked signal `uninterruptible` installs so that an
    /// outer abort cannot reach the protected subtree.
    pub fn fresh_unlinked() -> (AbortController, AbortSignal) {
        let controller = AbortController::new();
        let signal = controller.signal();
        (controller, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn abort_is_observed_by_children() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.aborted());
        controller.abort();
        assert!(signal.aborted());
    }

    #[tokio::test]
    async fn listener_fires_once_on_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        signal.add_event_listener(move || fired2.store(true, Ordering::SeqCst));
        controller.abort();
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn removed_listener_does_not_fire() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        let handle = signal.add_event_listener(move || fired2.store(true, Ordering::SeqCst));
        handle.remove();
        tokio::task::yield_now().await;
        controller.abort();
        tokio::task::yield_now().await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fresh_unlinked_ignores_outer_abort() {
        let controller = AbortController::new();
        let outer_signal = controller.signal();
        let (_inner_controller, inner_signal) = AbortSignal::fresh_unlinked();
        controller.abort();
        assert!(outer_signal.aborted());
        assert!(!inner_signal.aborted());
    }
}
