//! Type-erased effect, used where a concrete combinator type cannot be named:
//! scope finalizers, the `async` bridge's optional cleanup effect, and a
//! forked child's stored body.
//!
//! Boxing clones the environment into the boxed future to reach `'static`,
//! which is cheap here since `Env` is an `im::HashMap` behind the scenes.

use std::future::Future;
use std::pin::Pin;

use crate::env::Env;
use crate::failure::MicroResult;

use super::trait_def::MicroEffect;

/// A boxed future that is `Send` and lives for at least `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased effect producing `A` or `Failure<E>`.
pub struct BoxedEffect<A, E> {
    run_fn: Box<dyn FnOnce(Env) -> BoxFuture<'static, MicroResult<A, E>> + Send>,
}

impl<A, E> std::fmt::Debug for BoxedEffect<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEffect").finish()
    }
}

impl<A: Send + 'static, E: Send + 'static> BoxedEffect<A, E> {
    /// Erase `effect`'s concrete type.
    pub fn new<Eff>(effect: Eff) -> Self
    where
        Eff: MicroEffect<Output = A, Error = E> + Send + 'static,
    {
        BoxedEffect {
            run_fn: Box::new(move |env: Env| Box::pin(async move { effect.run(&env).await })),
        }
    }
}

impl<A: Send + 'static, E: Send + 'static> MicroEffect for BoxedEffect<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        (self.run_fn)(env.clone()).await
    }
}

/// Extension method adding `.boxed()` to any effect.
pub trait BoxedExt: MicroEffect + Send + Sized + 'static
where
    Self::Output: Send + 'static,
    Self::Error: Send + 'static,
{
    /// Erase this effect's concrete type into a [`BoxedEffect`].
    fn boxed(self) -> BoxedEffect<Self::Output, Self::Error> {
        BoxedEffect::new(self)
    }
}

impl<Eff> BoxedExt for Eff
where
    Eff: MicroEffect + Send + 'static,
    Eff::Output: Send + 'static,
    Eff::Error: Send + 'static,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::succeed;

    #[tokio::test]
    async fn boxed_effect_runs_through_erasure() {
        let env = Env::root();
        let boxed: BoxedEffect<i32, ()> = BoxedEffect::new(succeed(42));
        assert_eq!(boxed.run(&env).await, Ok(42));
    }

    #[tokio::test]
    async fn boxed_ext_method() {
        let env = Env::root();
        let boxed = succeed::<i32, ()>(7).boxed();
        assert_eq!(boxed.run(&env).await, Ok(7));
    }
}
