//! The `async` constructor: the sole bridge from a host callback-based
//! concurrency primitive into the effect system.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::env::abort::AbortSignal;
use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use crate::effect::boxed::BoxedEffect;
use crate::effect::guard::check_interrupt;
use crate::effect::trait_def::MicroEffect;

/// Resolves an in-flight [`AsyncEffect`]. Idempotent: the first call wins,
/// every call after that is silently ignored.
pub struct Resume<A, E> {
    sender: Arc<Mutex<Option<oneshot::Sender<MicroResult<A, E>>>>>,
}

impl<A, E> Clone for Resume<A, E> {
    fn clone(&self) -> Self {
        Resume {
            sender: self.sender.clone(),
        }
    }
}

impl<A, E> fmt::Debug for Resume<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume").finish()
    }
}

impl<A, E> Resume<A, E> {
    /// Resolve the waiting [`AsyncEffect`] with `result`. A no-op if this
    /// (or any other clone of this) `Resume` has already fired.
    pub fn resume(&self, result: MicroResult<A, E>) {
        if let Some(tx) = self.sender.lock().unwrap().take() {
            let _ = tx.send(result);
        }
    }
}

/// An effect bridging a host callback-based async primitive. See [`async_effect`].
pub struct AsyncEffect<F> {
    register: F,
}

impl<F> fmt::Debug for AsyncEffect<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncEffect").finish()
    }
}

impl<F, A, E> MicroEffect for AsyncEffect<F>
where
    F: FnOnce(Resume<A, E>, AbortSignal) -> Option<BoxedEffect<(), E>> + Send,
    A: Send + 'static,
    E: Send + Sync + 'static,
{
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }

        let (tx, rx) = oneshot::channel();
        let resume = Resume {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        let signal = env.abort_signal();

        let cleanup = (self.register)(resume.clone(), signal.clone());

        let listener = cleanup.map(|cleanup_effect| {
            let resume_for_listener = resume.clone();
            let env_for_listener = env.clone();
            signal.add_event_listener(move || {
                let resume = resume_for_listener.clone();
                let env = env_for_listener.with_fresh_uninterruptible_signal();
                tokio::spawn(async move {
                    let _ = cleanup_effect.run(&env).await;
                    resume.resume(Err(Failure::Aborted));
                });
            })
        });

        let result = match rx.await {
            Ok(result) => result,
            // The registering callback dropped `resume` without ever calling
            // it (a bug in the callback). Surface it as an abort rather than
            // hanging forever.
            Err(_) => Err(Failure::Aborted),
        };

        if let Some(handle) = listener {
            handle.remove();
        }

        result
    }
}

/// Bridge a host callback-based async primitive into the effect system.
///
/// `register` is invoked exactly once with a [`Resume`] handle and the
/// current abort signal; it may return a cleanup effect. If it does, and the
/// signal aborts before `resume` is called, the cleanup effect runs
/// uninterruptibly and the async effect resolves to `Err(Aborted)`.
pub fn async_effect<F, A, E>(register: F) -> AsyncEffect<F>
where
    F: FnOnce(Resume<A, E>, AbortSignal) -> Option<BoxedEffect<(), E>> + Send,
    A: Send + 'static,
    E: Send + Sync + 'static,
{
    AsyncEffect { register }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resume_delivers_the_result() {
        let env = Env::root();
        let effect = async_effect(|resume: Resume<i32, ()>, _signal| {
            resume.resume(Ok(42));
            None
        });
        assert_eq!(effect.run(&env).await, Ok(42));
    }

    #[tokio::test]
    async fn second_resume_is_ignored() {
        let env = Env::root();
        let effect = async_effect(|resume: Resume<i32, ()>, _signal| {
            resume.resume(Ok(1));
            resume.resume(Ok(2));
            None
        });
        assert_eq!(effect.run(&env).await, Ok(1));
    }

    #[tokio::test]
    async fn abort_runs_cleanup_then_resolves_aborted() {
        let env = Env::root();
        let controller = env.abort_controller();
        let cleaned = Arc::new(Mutex::new(false));
        let cleaned_for_cleanup = cleaned.clone();

        let task = tokio::spawn({
            let env = env.clone();
            async move {
                async_effect(move |_resume: Resume<i32, ()>, _signal| {
                    Some(BoxedEffect::new(crate::effect::constructors::sync(move || {
                        *cleaned_for_cleanup.lock().unwrap() = true;
                    })))
                })
                .run(&env)
                .await
            }
        });

        tokio::task::yield_now().await;
        controller.abort();
        let result = task.await.unwrap();
        assert_eq!(result, Err(Failure::Aborted));
        assert!(*cleaned.lock().unwrap());
    }
}
