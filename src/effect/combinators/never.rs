use std::fmt;
use std::marker::PhantomData;

use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use crate::effect::guard::check_interrupt;
use crate::effect::trait_def::MicroEffect;

/// A suspension that never resumes on its own. The only way it settles is
/// through cancellation. See [`never`].
pub struct Never<A, E> {
    _marker: PhantomData<fn() -> (A, E)>,
}

impl<A, E> fmt::Debug for Never<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Never").finish()
    }
}

impl<A: Send, E: Send> MicroEffect for Never<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        env.abort_signal().cancelled().await;
        Err(Failure::Aborted)
    }
}

/// An effect that never resolves by itself; it only settles when its
/// environment's abort signal fires, resolving to `Err(Aborted)`. Useful as
/// the body of a [`crate::effect::handle::fork`]ed child meant to be killed
/// by its owner rather than to complete.
pub fn never<A: Send, E: Send>() -> Never<A, E> {
    Never {
        _marker: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_resolves_only_on_abort() {
        let env = Env::root();
        let controller = env.abort_controller();
        let task = tokio::spawn({
            let env = env.clone();
            async move { never::<i32, ()>().run(&env).await }
        });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        controller.abort();
        let result = task.await.unwrap();
        assert_eq!(result, Err(Failure::Aborted));
    }
}
