//! `acquireRelease` / `acquireUseRelease`: the resource-safety combinators
//! built on [`super::scope`] and [`super::interrupt`].

use std::fmt;
use std::sync::Arc;

use crate::context::ServiceNotFound;
use crate::env::Env;
use crate::failure::{Defect, Failure, MicroResult};

use super::guard::check_interrupt;
use super::interrupt::{uninterruptible, uninterruptible_mask};
use super::scope::{ScopeExit, SCOPE_TAG};
use super::trait_def::MicroEffect;

fn missing_scope<A, E>() -> MicroResult<A, E> {
    Err(Failure::Unexpected(Defect::new(ServiceNotFound {
        tag: SCOPE_TAG.id(),
    })))
}

/// The effect produced by [`acquire_release`].
pub struct AcquireRelease<Acquire, Release> {
    acquire: Acquire,
    release: Release,
}

impl<Acquire, Release> fmt::Debug for AcquireRelease<Acquire, Release> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireRelease").finish()
    }
}

impl<Acquire, Release, RelEff, A, E> MicroEffect for AcquireRelease<Acquire, Release>
where
    Acquire: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + Sync + 'static,
    E: Send + 'static,
    Release: FnOnce(Arc<A>, ScopeExit) -> RelEff + Send + 'static,
    RelEff: MicroEffect<Output = ()> + Send + 'static,
    RelEff::Error: fmt::Debug + Send + Sync + 'static,
{
    type Output = Arc<A>;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<Arc<A>, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        let Some(scope) = env.context().get(SCOPE_TAG) else {
            return missing_scope();
        };
        let resource = Arc::new(uninterruptible(self.acquire).run(env).await?);
        let resource_for_release = resource.clone();
        let release = self.release;
        let _ = scope
            .add_finalizer_with_exit(move |exit| release(resource_for_release, exit))
            .run(env)
            .await;
        Ok(resource)
    }
}

/// Acquire a resource uninterruptibly, registering `release(resource, exit)`
/// as a finalizer on the ambient [`super::scope::Scope`] rather than running
/// it immediately (`release` fires when the enclosing [`super::scope::scoped`]
/// region closes). Requires a [`super::scope::Scope`] in the environment;
/// absent one, resolves to an `Unexpected` defect (a programmer error, not a
/// typed `E`).
///
/// Returns `Arc<A>` rather than a bare `A`, since the resource must remain
/// reachable from both the caller and the registered finalizer closure (see
/// DESIGN.md).
pub fn acquire_release<Acquire, Release, RelEff, A, E>(
    acquire: Acquire,
    release: Release,
) -> AcquireRelease<Acquire, Release>
where
    Acquire: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + Sync + 'static,
    E: Send + 'static,
    Release: FnOnce(Arc<A>, ScopeExit) -> RelEff + Send + 'static,
    RelEff: MicroEffect<Output = ()> + Send + 'static,
    RelEff::Error: fmt::Debug + Send + Sync + 'static,
{
    AcquireRelease { acquire, release }
}

/// The effect produced by [`acquire_use_release`].
pub struct AcquireUseRelease<Acquire, Use, Release> {
    acquire: Acquire,
    use_fn: Use,
    release: Release,
}

impl<Acquire, Use, Release> fmt::Debug for AcquireUseRelease<Acquire, Use, Release> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireUseRelease").finish()
    }
}

impl<Acquire, Use, Release, UseEff, RelEff, A, T, E> MicroEffect
    for AcquireUseRelease<Acquire, Use, Release>
where
    Acquire: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Use: FnOnce(Arc<A>) -> UseEff + Send + 'static,
    UseEff: MicroEffect<Output = T, Error = E> + Send + 'static,
    Release: FnOnce(Arc<A>, MicroResult<T, E>) -> RelEff + Send + 'static,
    RelEff: MicroEffect<Output = ()> + Send + 'static,
    RelEff::Error: fmt::Debug + Send + Sync + 'static,
    MicroResult<T, E>: Clone,
{
    type Output = T;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<T, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        let use_fn = self.use_fn;
        let release = self.release;
        let acquire = self.acquire;
        uninterruptible_mask(move |restore| AcquireUseReleaseBody {
            acquire,
            use_fn,
            release,
            restore,
        })
        .run(env)
        .await
    }
}

struct AcquireUseReleaseBody<Acquire, Use, Release> {
    acquire: Acquire,
    use_fn: Use,
    release: Release,
    restore: super::interrupt::Restore,
}

impl<Acquire, Use, Release, UseEff, RelEff, A, T, E> MicroEffect
    for AcquireUseReleaseBody<Acquire, Use, Release>
where
    Acquire: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Use: FnOnce(Arc<A>) -> UseEff + Send + 'static,
    UseEff: MicroEffect<Output = T, Error = E> + Send + 'static,
    Release: FnOnce(Arc<A>, MicroResult<T, E>) -> RelEff + Send + 'static,
    RelEff: MicroEffect<Output = ()> + Send + 'static,
    RelEff::Error: fmt::Debug + Send + Sync + 'static,
    MicroResult<T, E>: Clone,
{
    type Output = T;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<T, E> {
        let resource = Arc::new(self.acquire.run(env).await?);
        let resource_for_use = resource.clone();
        let use_fn = self.use_fn;
        let use_result = self
            .restore
            .restore(use_fn(resource_for_use))
            .run(env)
            .await;
        let resource_for_release = resource.clone();
        let release_effect = (self.release)(resource_for_release, use_result.clone());
        let _ = uninterruptible(release_effect).run(env).await;
        use_result
    }
}

/// Acquire a resource uninterruptibly, run `use_fn` on it under the caller's
/// own interruptibility (so it can be cancelled), then run `release` against
/// the resource and the captured use-result uninterruptibly, before
/// re-emitting that result.
///
/// `release`'s result is observed only for its finalizer-failure bookkeeping;
/// the effect's own output and error channel are always `use_fn`'s. Acquire
/// is atomic with respect to cancellation: even if the surrounding effect is
/// aborted during `use_fn`, `release` still runs to completion before this
/// effect settles.
pub fn acquire_use_release<Acquire, Use, Release, UseEff, RelEff, A, T, E>(
    acquire: Acquire,
    use_fn: Use,
    release: Release,
) -> AcquireUseRelease<Acquire, Use, Release>
where
    Acquire: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    Use: FnOnce(Arc<A>) -> UseEff + Send + 'static,
    UseEff: MicroEffect<Output = T, Error = E> + Send + 'static,
    Release: FnOnce(Arc<A>, MicroResult<T, E>) -> RelEff + Send + 'static,
    RelEff: MicroEffect<Output = ()> + Send + 'static,
    RelEff::Error: fmt::Debug + Send + Sync + 'static,
    MicroResult<T, E>: Clone,
{
    AcquireUseRelease {
        acquire,
        use_fn,
        release,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::effect::constructors::{fail, sync};
    use crate::effect::scope::Scope;
    use std::sync::Mutex;

    fn env_with_scope() -> (Env, Scope) {
        let scope = Scope::new();
        let env = Env::root().with_context(Context::empty().add(SCOPE_TAG, scope.clone()));
        (env, scope)
    }

    #[tokio::test]
    async fn acquire_release_runs_release_when_scope_closes() {
        let (env, scope) = env_with_scope();
        let released: Arc<Mutex<Option<ScopeExit>>> = Arc::new(Mutex::new(None));
        let released_for_release = released.clone();

        let resource = acquire_release(sync::<_, &'static str, ()>(|| "conn"), move |res, exit| {
            let released = released_for_release.clone();
            sync::<_, (), ()>(move || {
                assert_eq!(*res, "conn");
                *released.lock().unwrap() = Some(exit);
            })
        })
        .run(&env)
        .await
        .unwrap();

        assert_eq!(*resource, "conn");
        assert!(released.lock().unwrap().is_none());

        scope.close(ScopeExit::Success).run(&env).await.unwrap();
        assert_eq!(*released.lock().unwrap(), Some(ScopeExit::Success));
    }

    #[tokio::test]
    async fn acquire_use_release_runs_release_exactly_once_on_use_failure() {
        let env = Env::root();
        let touched: Arc<Mutex<Vec<MicroResult<(), &'static str>>>> = Arc::new(Mutex::new(Vec::new()));
        let touched_for_release = touched.clone();

        let result = acquire_use_release(
            sync::<_, &'static str, &'static str>(|| "r"),
            |_res: Arc<&'static str>| fail::<(), &'static str>("boom"),
            move |_res, use_result: MicroResult<(), &'static str>| {
                let touched = touched_for_release.clone();
                sync::<_, (), &'static str>(move || {
                    touched.lock().unwrap().push(use_result);
                })
            },
        )
        .run(&env)
        .await;

        assert_eq!(result, Err(Failure::Expected("boom")));
        let log = touched.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0], Err(Failure::Expected("boom")));
    }

    #[tokio::test]
    async fn acquire_use_release_runs_release_on_success() {
        let env = Env::root();
        let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let released_for_release = released.clone();

        let result = acquire_use_release(
            sync::<_, i32, ()>(|| 42),
            |res: Arc<i32>| crate::effect::constructors::succeed::<i32, ()>(*res * 2),
            move |_res, _use_result| {
                let released = released_for_release.clone();
                sync::<_, (), ()>(move || {
                    released.store(true, std::sync::atomic::Ordering::SeqCst);
                })
            },
        )
        .run(&env)
        .await;

        assert_eq!(result, Ok(84));
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn acquire_release_without_scope_dies() {
        let env = Env::root();
        let result = acquire_release(sync::<_, i32, ()>(|| 1), |_res, _exit| {
            crate::effect::constructors::succeed::<(), ()>(())
        })
        .run(&env)
        .await;
        assert!(matches!(result, Err(Failure::Unexpected(_))));
    }
}
