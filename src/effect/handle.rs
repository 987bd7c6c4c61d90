//! `fork`/`forkDaemon` and the [`Handle`] they return: a forked child's
//! one-shot settlement, observation, abort and join.

use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::env::abort::{AbortController, ListenerHandle};
use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use super::guard::check_interrupt;
use super::trait_def::MicroEffect;

/// A handle returned by [`Handle::add_observer`], usable to detach the
/// observer before the child settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer<A, E> = Box<dyn FnOnce(MicroResult<A, E>) + Send>;

struct HandleState<A, E> {
    result: Option<MicroResult<A, E>>,
    observers: Vec<(ObserverId, Observer<A, E>)>,
    next_observer_id: u64,
    parent_listener: Option<ListenerHandle>,
}

/// A reference to a running or already-settled forked child. See [`fork`].
pub struct Handle<A, E> {
    inner: Arc<Mutex<HandleState<A, E>>>,
    controller: AbortController,
}

impl<A, E> Clone for Handle<A, E> {
    fn clone(&self) -> Self {
        Handle {
            inner: self.inner.clone(),
            controller: self.controller.clone(),
        }
    }
}

impl<A, E> fmt::Debug for Handle<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock().unwrap();
        f.debug_struct("Handle")
            .field("settled", &state.result.is_some())
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl<A: Clone + Send + Sync + 'static, E: Clone + Send + Sync + 'static> Handle<A, E> {
    pub(crate) fn new(controller: AbortController) -> Self {
        Handle {
            inner: Arc::new(Mutex::new(HandleState {
                result: None,
                observers: Vec::new(),
                next_observer_id: 0,
                parent_listener: None,
            })),
            controller,
        }
    }

    pub(crate) fn set_parent_listener(&self, listener: ListenerHandle) {
        self.inner.lock().unwrap().parent_listener = Some(listener);
    }

    /// Settle this handle with `result`. A no-op if already settled. Detaches
    /// the parent listener (if any), aborts the handle's own controller, and
    /// fans `result` out to every registered observer, clearing the set.
    pub(crate) fn settle(&self, result: MicroResult<A, E>) {
        let (observers, listener) = {
            let mut state = self.inner.lock().unwrap();
            if state.result.is_some() {
                return;
            }
            state.result = Some(result.clone());
            (std::mem::take(&mut state.observers), state.parent_listener.take())
        };
        if let Some(listener) = listener {
            listener.remove();
        }
        self.controller.abort();
        #[cfg(feature = "tracing")]
        ::tracing::debug!(settled_ok = result.is_ok(), observers = observers.len(), "handle settled");
        for (_, observer) in observers {
            observer(result.clone());
        }
    }

    /// The settled result, if this handle has already settled.
    pub fn unsafe_poll(&self) -> Option<MicroResult<A, E>> {
        self.inner.lock().unwrap().result.clone()
    }

    /// Register `f` to run once this handle settles. If it has already
    /// settled, `f` runs immediately, synchronously, before this call returns.
    pub fn add_observer<F>(&self, f: F) -> ObserverId
    where
        F: FnOnce(MicroResult<A, E>) + Send + 'static,
    {
        let mut state = self.inner.lock().unwrap();
        match state.result.clone() {
            Some(result) => {
                drop(state);
                f(result);
                ObserverId(u64::MAX)
            }
            None => {
                let id = ObserverId(state.next_observer_id);
                state.next_observer_id += 1;
                state.observers.push((id, Box::new(f)));
                id
            }
        }
    }

    /// Detach a previously registered observer. A no-op if it already ran or
    /// was already removed.
    pub fn remove_observer(&self, id: ObserverId) {
        self.inner.lock().unwrap().observers.retain(|(oid, _)| *oid != id);
    }

    /// Trigger this child's controller, then wait for it to settle.
    pub fn abort(&self) -> Abort<A, E> {
        Abort { handle: self.clone() }
    }

    /// Suspend until this child settles, yielding its final [`MicroResult`]
    /// as plain data. This effect itself never fails with a typed error.
    pub fn await_(&self) -> Await<A, E> {
        Await { handle: self.clone() }
    }

    /// Suspend until this child settles, re-raising its failure or yielding
    /// its success.
    pub fn join(&self) -> Join<A, E> {
        Join { handle: self.clone() }
    }
}

/// The effect produced by [`Handle::abort`].
pub struct Abort<A, E> {
    handle: Handle<A, E>,
}

impl<A, E> fmt::Debug for Abort<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Abort").finish()
    }
}

impl<A: Clone + Send + Sync + 'static, E: Clone + Send + Sync + 'static> MicroEffect for Abort<A, E> {
    type Output = ();
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<(), Infallible> {
        self.handle.controller.abort();
        let _ = Await {
            handle: self.handle,
        }
        .run(env)
        .await;
        Ok(())
    }
}

/// The effect produced by [`Handle::await_`].
pub struct Await<A, E> {
    handle: Handle<A, E>,
}

impl<A, E> fmt::Debug for Await<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Await").finish()
    }
}

impl<A: Clone + Send + Sync + 'static, E: Clone + Send + Sync + 'static> MicroEffect for Await<A, E> {
    type Output = MicroResult<A, E>;
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<MicroResult<A, E>, Infallible> {
        if let Some(result) = self.handle.unsafe_poll() {
            return Ok(result);
        }
        if let Some(failure) = check_interrupt(env) {
            return Err(failure);
        }

        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let observer_id = self.handle.add_observer(move |result| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(result);
            }
        });

        let signal = env.abort_signal();
        tokio::select! {
            received = rx => {
                match received {
                    Ok(result) => Ok(result),
                    // The sender was dropped without sending, which only
                    // happens if this handle is itself leaked mid-settle.
                    // Treat it the same as an abort rather than hanging.
                    Err(_) => Err(Failure::Aborted),
                }
            }
            _ = signal.cancelled(), if env.interruptible() => {
                self.handle.remove_observer(observer_id);
                Err(Failure::Aborted)
            }
        }
    }
}

/// The effect produced by [`Handle::join`].
pub struct Join<A, E> {
    handle: Handle<A, E>,
}

impl<A, E> fmt::Debug for Join<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join").finish()
    }
}

impl<A: Clone + Send + Sync + 'static, E: Clone + Send + Sync + 'static> MicroEffect for Join<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        match (Await { handle: self.handle }).run(env).await {
            Ok(inner) => inner,
            Err(Failure::Aborted) => Err(Failure::Aborted),
            Err(Failure::Unexpected(d)) => Err(Failure::Unexpected(d)),
            Err(Failure::Expected(never)) => match never {},
        }
    }
}

/// The effect produced by [`fork`] / [`fork_daemon`].
pub struct Fork<Inner> {
    effect: Inner,
    daemon: bool,
}

impl<Inner> fmt::Debug for Fork<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fork").field("daemon", &self.daemon).finish()
    }
}

impl<Inner> MicroEffect for Fork<Inner>
where
    Inner: MicroEffect + Send + 'static,
    Inner::Output: Clone + Send + Sync + 'static,
    Inner::Error: Clone + Send + Sync + 'static,
{
    type Output = Handle<Inner::Output, Inner::Error>;
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<Handle<Inner::Output, Inner::Error>, Infallible> {
        let (child_env, child_controller) = env.with_child_controller();
        let handle = Handle::new(child_controller.clone());

        if !self.daemon {
            let child_controller_for_listener = child_controller.clone();
            let listener = env
                .abort_signal()
                .add_event_listener(move || child_controller_for_listener.abort());
            handle.set_parent_listener(listener);
        }

        let handle_for_task = handle.clone();
        let effect = self.effect;
        let daemon = self.daemon;
        tokio::spawn(async move {
            #[cfg(feature = "tracing")]
            ::tracing::debug!(daemon, "fork started");
            tokio::task::yield_now().await;
            let result = effect.run(&child_env).await;
            handle_for_task.settle(result);
        });

        Ok(handle)
    }
}

/// Fork `effect` into a child linked to the caller's abort signal: aborting
/// the parent aborts the child. The child starts on the next scheduler tick,
/// so the caller always observes the returned [`Handle`] before the child's
/// body runs.
pub fn fork<Inner>(effect: Inner) -> Fork<Inner>
where
    Inner: MicroEffect + Send + 'static,
    Inner::Output: Clone + Send + Sync + 'static,
    Inner::Error: Clone + Send + Sync + 'static,
{
    Fork {
        effect,
        daemon: false,
    }
}

/// Like [`fork`], but the child is not linked to the caller's abort signal:
/// it keeps running after the parent aborts or settles.
pub fn fork_daemon<Inner>(effect: Inner) -> Fork<Inner>
where
    Inner: MicroEffect + Send + 'static,
    Inner::Output: Clone + Send + Sync + 'static,
    Inner::Error: Clone + Send + Sync + 'static,
{
    Fork {
        effect,
        daemon: true,
    }
}
