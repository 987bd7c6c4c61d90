//! Scopes: a registry of finalizers closed at most once, and
//! `acquire`/`use`/`release` built on top of it.

use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::context::Tag;
use crate::env::Env;
use crate::failure::{erase_failure, Defect, Failure, MicroResult};

use super::boxed::BoxFuture;
use super::guard::check_interrupt;
use super::trait_def::MicroEffect;

/// Well-known tag for the ambient [`Scope`] service.
pub static SCOPE_TAG: Tag<Scope> = Tag::new("effect/Micro/MicroScope");

/// Which of the three failure kinds a scope closed with, without carrying the
/// kind's payload (a `Scope` is not generic over any particular `E`, so a
/// finalizer only ever learns *that* the region failed and *how*, never the
/// concrete value; see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A typed domain error (`Failure::Expected`).
    Expected,
    /// A panic or `die()` defect (`Failure::Unexpected`).
    Unexpected,
    /// Cancellation (`Failure::Aborted`).
    Aborted,
}

/// How the scoped region completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeExit {
    /// The region succeeded.
    Success,
    /// The region failed, with the kind of failure it produced.
    Failure(FailureKind),
}

impl ScopeExit {
    /// Derive an exit tag from a concrete [`Failure`] result.
    pub fn from_result<A, E>(result: &MicroResult<A, E>) -> Self {
        match result {
            Ok(_) => ScopeExit::Success,
            Err(Failure::Expected(_)) => ScopeExit::Failure(FailureKind::Expected),
            Err(Failure::Unexpected(_)) => ScopeExit::Failure(FailureKind::Unexpected),
            Err(Failure::Aborted) => ScopeExit::Failure(FailureKind::Aborted),
        }
    }
}

type FinalizerFn = Box<dyn FnOnce(Env, ScopeExit) -> BoxFuture<'static, Vec<Defect>> + Send>;

/// A handle returned by [`Scope::add_finalizer`], usable to detach a
/// registered finalizer before the scope closes (used internally by
/// [`Scope::fork`] to implement "closing the child detaches from the parent").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizerId(u64);

enum ScopeStatus {
    Open,
    Closed(ScopeExit),
}

struct ScopeState {
    status: ScopeStatus,
    finalizers: Vec<(FinalizerId, FinalizerFn)>,
    next_id: u64,
}

impl ScopeState {
    fn new() -> Self {
        ScopeState {
            status: ScopeStatus::Open,
            finalizers: Vec::new(),
            next_id: 0,
        }
    }
}

/// A registry of finalizers, closed at most once.
///
/// Finalizers are plain `Vec` entries mutated only while holding the internal
/// `Mutex`; the lock exists to satisfy `Send`/`Sync` for values that may cross
/// a `tokio::spawn` boundary, not because concurrent mutation from multiple
/// tasks is expected in the steady state.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<Mutex<ScopeState>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock().unwrap();
        f.debug_struct("Scope")
            .field("open", &matches!(state.status, ScopeStatus::Open))
            .field("finalizers", &state.finalizers.len())
            .finish()
    }
}

impl Scope {
    /// A fresh, open scope with no registered finalizers.
    pub fn new() -> Self {
        Scope {
            inner: Arc::new(Mutex::new(ScopeState::new())),
        }
    }

    /// Register `effect` as a finalizer. If the scope is still open, it is
    /// appended (finalizers run LIFO on close). If the scope already closed,
    /// `effect` runs immediately against the exit it closed with.
    pub fn add_finalizer<Eff>(&self, effect: Eff) -> AddFinalizer<Eff>
    where
        Eff: MicroEffect<Output = ()> + Send + 'static,
        Eff::Error: fmt::Debug + Send + Sync + 'static,
    {
        AddFinalizer {
            scope: self.clone(),
            effect,
        }
    }

    /// Register a finalizer whose effect is built from the scope's exit tag
    /// once it is known (the form [`crate::effect::bracket::acquire_release`]
    /// needs, since `release(a, finalResult)` cannot be built until the
    /// surrounding region has actually settled).
    pub fn add_finalizer_with_exit<F, Eff>(&self, f: F) -> AddFinalizerWithExit<F>
    where
        F: FnOnce(ScopeExit) -> Eff + Send + 'static,
        Eff: MicroEffect<Output = ()> + Send + 'static,
        Eff::Error: fmt::Debug + Send + Sync + 'static,
    {
        AddFinalizerWithExit {
            scope: self.clone(),
            f,
        }
    }

    /// Detach a previously registered finalizer so it will not run on close.
    /// A no-op if the scope has already closed or the id was already removed.
    pub fn remove_finalizer(&self, id: FinalizerId) {
        let mut state = self.inner.lock().unwrap();
        state.finalizers.retain(|(fid, _)| *fid != id);
    }

    /// Close the scope with `exit`, running every registered finalizer in
    /// reverse insertion order. Every finalizer runs regardless of earlier
    /// finalizer failures; their failures (if any) are returned as a list
    /// rather than short-circuiting the close. A no-op returning an empty
    /// list if the scope is already closed.
    pub fn close(&self, exit: ScopeExit) -> Close {
        Close {
            scope: self.clone(),
            exit,
        }
    }

    /// Spawn a child scope linked to this one: closing the parent closes the
    /// child, and closing the child detaches it from the parent.
    pub fn fork(&self) -> Scope {
        let child = Scope::new();
        let child_for_finalizer = child.clone();
        let finalizer_id = {
            let mut state = self.inner.lock().unwrap();
            match state.status {
                ScopeStatus::Open => {
                    let id = FinalizerId(state.next_id);
                    state.next_id += 1;
                    state.finalizers.push((
                        id,
                        Box::new(move |env: Env, exit: ScopeExit| {
                            Box::pin(async move { child_for_finalizer.close(exit).run(&env).await.unwrap_or_default() })
                        }),
                    ));
                    Some(id)
                }
                // The parent already closed; the child starts and ends closed
                // with the same exit, with no finalizers of its own yet.
                ScopeStatus::Closed(exit) => {
                    child_for_finalizer.inner.lock().unwrap().status = ScopeStatus::Closed(exit);
                    None
                }
            }
        };
        if let Some(id) = finalizer_id {
            let parent = self.clone();
            let detach_child = child.clone();
            // The child removes its own parent-registered finalizer once it
            // closes on its own, so the parent does not try to close it twice.
            detach_child
                .inner
                .lock()
                .unwrap()
                .finalizers
                .push((
                    FinalizerId(u64::MAX),
                    Box::new(move |_env: Env, _exit: ScopeExit| {
                        parent.remove_finalizer(id);
                        Box::pin(async { Vec::new() })
                    }),
                ));
        }
        child
    }
}

/// The effect produced by [`Scope::add_finalizer`].
pub struct AddFinalizer<Eff> {
    scope: Scope,
    effect: Eff,
}

impl<Eff> fmt::Debug for AddFinalizer<Eff> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddFinalizer").finish()
    }
}

impl<Eff> MicroEffect for AddFinalizer<Eff>
where
    Eff: MicroEffect<Output = ()> + Send + 'static,
    Eff::Error: fmt::Debug + Send + Sync + 'static,
{
    type Output = FinalizerId;
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<FinalizerId, Infallible> {
        let exit_if_closed = {
            let mut state = self.scope.inner.lock().unwrap();
            match state.status {
                ScopeStatus::Open => {
                    let id = FinalizerId(state.next_id);
                    state.next_id += 1;
                    let effect = self.effect;
                    state.finalizers.push((
                        id,
                        Box::new(move |env: Env, _exit: ScopeExit| {
                            Box::pin(async move {
                                match effect.run(&env).await {
                                    Ok(()) => Vec::new(),
                                    Err(f) => vec![erase_failure(f)],
                                }
                            })
                        }),
                    ));
                    return Ok(id);
                }
                ScopeStatus::Closed(exit) => Some(exit),
            }
        };
        if exit_if_closed.is_some() {
            let _ = self.effect.run(env).await;
        }
        // A scope that is already closed has no further finalizer slots to
        // hand out; the id is nominal since nothing will ever look it up.
        Ok(FinalizerId(u64::MAX))
    }
}

/// The effect produced by [`Scope::add_finalizer_with_exit`].
pub struct AddFinalizerWithExit<F> {
    scope: Scope,
    f: F,
}

impl<F> fmt::Debug for AddFinalizerWithExit<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddFinalizerWithExit").finish()
    }
}

impl<F, Eff> MicroEffect for AddFinalizerWithExit<F>
where
    F: FnOnce(ScopeExit) -> Eff + Send + 'static,
    Eff: MicroEffect<Output = ()> + Send + 'static,
    Eff::Error: fmt::Debug + Send + Sync + 'static,
{
    type Output = FinalizerId;
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<FinalizerId, Infallible> {
        let exit_if_closed = {
            let mut state = self.scope.inner.lock().unwrap();
            match state.status {
                ScopeStatus::Open => {
                    let id = FinalizerId(state.next_id);
                    state.next_id += 1;
                    let f = self.f;
                    state.finalizers.push((
                        id,
                        Box::new(move |env: Env, exit: ScopeExit| {
                            Box::pin(async move {
                                let effect = f(exit);
                                match effect.run(&env).await {
                                    Ok(()) => Vec::new(),
                                    Err(e) => vec![erase_failure(e)],
                                }
                            })
                        }),
                    ));
                    return Ok(id);
                }
                ScopeStatus::Closed(exit) => Some(exit),
            }
        };
        if let Some(exit) = exit_if_closed {
            let effect = (self.f)(exit);
            let _ = effect.run(env).await;
        }
        Ok(FinalizerId(u64::MAX))
    }
}

/// The effect produced by [`Scope::close`].
pub struct Close {
    scope: Scope,
    exit: ScopeExit,
}

impl fmt::Debug for Close {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Close").field("exit", &self.exit).finish()
    }
}

impl MicroEffect for Close {
    type Output = Vec<Defect>;
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<Vec<Defect>, Infallible> {
        let finalizers = {
            let mut state = self.scope.inner.lock().unwrap();
            match state.status {
                ScopeStatus::Closed(_) => return Ok(Vec::new()),
                ScopeStatus::Open => {
                    state.status = ScopeStatus::Closed(self.exit);
                    std::mem::take(&mut state.finalizers)
                }
            }
        };
        let mut failures = Vec::new();
        for (_, finalizer) in finalizers.into_iter().rev() {
            let ran = finalizer(env.clone(), self.exit).await;
            for defect in &ran {
                #[cfg(feature = "tracing")]
                ::tracing::warn!("scope finalizer failed: {:?}", defect);
                #[cfg(not(feature = "tracing"))]
                eprintln!("scope finalizer failed: {:?}", defect);
            }
            failures.extend(ran);
        }
        Ok(failures)
    }
}

/// Run `inner` under a freshly made [`Scope`] installed as the ambient
/// [`SCOPE_TAG`] service; the scope closes with `inner`'s result on completion,
/// success or failure.
pub struct Scoped<Inner> {
    inner: Inner,
}

impl<Inner> fmt::Debug for Scoped<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped").finish()
    }
}

impl<Inner: MicroEffect> MicroEffect for Scoped<Inner>
where
    Inner::Output: Send,
    Inner::Error: Send,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<Inner::Output, Inner::Error> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        let scope = Scope::new();
        #[cfg(feature = "tracing")]
        ::tracing::debug!("scope opened");
        let scoped_env = env.with_context(env.context().add(SCOPE_TAG, scope.clone()));
        let result = self.inner.run(&scoped_env).await;
        let exit = ScopeExit::from_result(&result);
        let _ = scope.close(exit).run(&scoped_env).await;
        #[cfg(feature = "tracing")]
        ::tracing::debug!(?exit, "scope closed");
        result
    }
}

/// Run `inner` under a fresh [`Scope`], closing it with `inner`'s result
/// (success or failure) on completion.
pub fn scoped<Inner: MicroEffect>(inner: Inner) -> Scoped<Inner> {
    Scoped { inner }
}
