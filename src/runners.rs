//! Entry points from plain Rust code into the effect world.
//!
//! [`run_fork`] is the primitive every other runner builds on: it seeds a
//! root [`Env`], spawns the effect, and hands back a live [`Handle`]. The
//! others squash or unwrap that handle's eventual settlement differently.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use crate::effect::handle::Handle;
use crate::effect::trait_def::MicroEffect;
use crate::env::Env;
use crate::failure::{AbortedSentinel, Defect, Failure};

/// A [`Failure`] with its error channel collapsed to a single `Defect`,
/// keeping only the distinction user-visible runners preserve: a typed
/// domain error versus everything else (panics, thrown defects, abort).
#[derive(Clone)]
pub enum SquashedFailure<E> {
    /// An expected, typed domain failure.
    Error(E),
    /// An unexpected defect, or an abort reduced to [`AbortedSentinel`].
    Defect(Defect),
}

impl<E: fmt::Debug> fmt::Debug for SquashedFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquashedFailure::Error(e) => f.debug_tuple("Error").field(e).finish(),
            SquashedFailure::Defect(d) => f.debug_tuple("Defect").field(d).finish(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for SquashedFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquashedFailure::Error(e) => write!(f, "{}", e),
            SquashedFailure::Defect(d) => write!(f, "{}", d),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for SquashedFailure<E> {}

fn squash<E>(failure: Failure<E>) -> SquashedFailure<E> {
    match failure {
        Failure::Expected(e) => SquashedFailure::Error(e),
        Failure::Unexpected(d) => SquashedFailure::Defect(d),
        Failure::Aborted => SquashedFailure::Defect(Defect::new(AbortedSentinel)),
    }
}

/// Build a root environment, fork `effect` into it, and return the live
/// [`Handle`] immediately. The primitive every other runner is built from.
pub fn run_fork<Eff>(effect: Eff) -> Handle<Eff::Output, Eff::Error>
where
    Eff: MicroEffect + Send + 'static,
    Eff::Output: Clone + Send + Sync + 'static,
    Eff::Error: Clone + Send + Sync + 'static,
{
    let env = Env::root();
    let handle = Handle::new(env.abort_controller());
    let handle_for_task = handle.clone();
    tokio::spawn(async move {
        let result = effect.run(&env).await;
        handle_for_task.settle(result);
    });
    handle
}

/// Run `effect` to completion, resolving with its success or rejecting with
/// its squashed failure (this crate's analogue of a promise-returning
/// runner).
///
/// ```
/// use micro_effect::prelude::*;
/// use micro_effect::runners::run_promise;
///
/// # tokio_test::block_on(async {
/// let result = run_promise(succeed::<i32, &'static str>(2).map(|x| x * 3)).await;
/// assert_eq!(result, Ok(6));
/// # });
/// ```
pub async fn run_promise<Eff>(effect: Eff) -> Result<Eff::Output, SquashedFailure<Eff::Error>>
where
    Eff: MicroEffect + Send + 'static,
    Eff::Output: Clone + Send + Sync + 'static,
    Eff::Error: Clone + Send + Sync + 'static,
{
    let handle = run_fork(effect);
    let env = Env::root();
    handle.join().run(&env).await.map_err(squash)
}

/// The outcome of [`run_sync_result`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncResult<A, E> {
    /// The effect resolved without suspending.
    Resolved(Result<A, Failure<E>>),
    /// The effect reached a suspension point (a `sleep`, an `async` bridge,
    /// an unsettled `fork`/`join`, ...) and did not resolve on its first
    /// poll.
    NotSynchronous,
}

/// Run `effect` against a root environment and poll it exactly once, with a
/// no-op waker, never going through the Tokio scheduler. If it resolves on
/// that single poll, returns the settled [`Failure`]-or-success; otherwise
/// reports that it did not resolve synchronously, leaving the still-pending
/// future to be dropped (and, with it, cancelling any work the effect had
/// already started).
pub fn run_sync_result<Eff>(effect: Eff) -> SyncResult<Eff::Output, Eff::Error>
where
    Eff: MicroEffect + Send + 'static,
{
    let env = Env::root();
    let mut future: Pin<Box<dyn Future<Output = Result<Eff::Output, Failure<Eff::Error>>> + Send>> =
        Box::pin(async move { effect.run(&env).await });
    let waker = futures::task::noop_waker();
    let mut cx = TaskContext::from_waker(&waker);
    match future.as_mut().poll(&mut cx) {
        Poll::Ready(result) => SyncResult::Resolved(result),
        Poll::Pending => SyncResult::NotSynchronous,
    }
}

/// Like [`run_sync_result`], but unwraps further: returns the success value
/// directly, or panics carrying the effect's [`Failure`] (or, if the effect
/// did not resolve synchronously, a plain string) as the panic payload,
/// the Rust analogue of an uncaught synchronous throw.
pub fn run_sync<Eff>(effect: Eff) -> Eff::Output
where
    Eff: MicroEffect + Send + 'static,
    Eff::Error: Send + 'static,
{
    match run_sync_result(effect) {
        SyncResult::Resolved(Ok(a)) => a,
        SyncResult::Resolved(Err(failure)) => std::panic::panic_any(failure),
        SyncResult::NotSynchronous => panic!("run_sync: effect did not resolve synchronously"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::{fail, succeed, sync};
    use crate::effect::combinators::sleep::sleep;
    use std::time::Duration;

    #[tokio::test]
    async fn run_promise_resolves_success() {
        let result = run_promise(succeed::<i32, &'static str>(5)).await;
        assert!(matches!(result, Ok(5)));
    }

    #[tokio::test]
    async fn run_promise_squashes_expected_failure() {
        let result = run_promise(fail::<i32, &'static str>("boom")).await;
        match result {
            Err(SquashedFailure::Error("boom")) => {}
            other => panic!("expected squashed Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_fork_returns_a_live_handle() {
        let handle = run_fork(sleep::<()>(Duration::from_millis(5)));
        assert_eq!(handle.unsafe_poll(), None);
        let result = handle.join().run(&Env::root()).await;
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn run_sync_result_resolves_a_synchronous_effect() {
        let result = run_sync_result(sync::<_, i32, ()>(|| 9));
        assert_eq!(result, SyncResult::Resolved(Ok(9)));
    }

    #[test]
    fn run_sync_result_reports_suspension() {
        let result = run_sync_result(sleep::<()>(Duration::from_secs(3600)));
        assert_eq!(result, SyncResult::NotSynchronous);
    }

    #[test]
    fn run_sync_returns_the_success_value() {
        assert_eq!(run_sync(sync::<_, i32, ()>(|| 3)), 3);
    }

    #[test]
    #[should_panic]
    fn run_sync_panics_on_failure() {
        run_sync(fail::<i32, &'static str>("boom"));
    }
}
