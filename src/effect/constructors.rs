//! Leaf constructors: the ways to build an effect from a plain value, a
//! fallible computation, or a lazily-constructed inner effect.

use std::fmt;
use std::marker::PhantomData;

use crate::context::Tag;
use crate::context::ServiceNotFound;
use crate::either::Either;
use crate::env::Env;
use crate::failure::{Defect, Failure, MicroResult};

use super::guard::{catch_panic, check_interrupt};
use super::trait_def::MicroEffect;

/// An effect that always succeeds with a fixed value. See [`succeed`].
pub struct Succeed<A, E> {
    value: A,
    _marker: PhantomData<fn() -> E>,
}

impl<A: fmt::Debug, E> fmt::Debug for Succeed<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Succeed").field(&self.value).finish()
    }
}

impl<A: Send, E: Send> MicroEffect for Succeed<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        Ok(self.value)
    }
}

/// An effect that always resolves successfully with `value`.
pub fn succeed<A: Send, E: Send>(value: A) -> Succeed<A, E> {
    Succeed {
        value,
        _marker: PhantomData,
    }
}

/// An effect that always fails with a typed, expected error. See [`fail`].
pub struct Fail<A, E> {
    error: E,
    _marker: PhantomData<fn() -> A>,
}

impl<A, E: fmt::Debug> fmt::Debug for Fail<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fail").field(&self.error).finish()
    }
}

impl<A: Send, E: Send> MicroEffect for Fail<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        Err(Failure::Expected(self.error))
    }
}

/// An effect that always fails with the expected error `error`.
pub fn fail<A: Send, E: Send>(error: E) -> Fail<A, E> {
    Fail {
        error,
        _marker: PhantomData,
    }
}

/// An effect that always fails with an unexpected defect. See [`die`].
pub struct Die<A, E> {
    defect: Defect,
    _marker: PhantomData<fn() -> (A, E)>,
}

impl<A, E> fmt::Debug for Die<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Die").field(&self.defect).finish()
    }
}

impl<A: Send, E: Send> MicroEffect for Die<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        Err(Failure::Unexpected(self.defect))
    }
}

/// An effect that always fails with an unexpected defect wrapping `value`.
pub fn die<A: Send, E: Send>(value: impl std::any::Any + Send + Sync) -> Die<A, E> {
    Die {
        defect: Defect::new(value),
        _marker: PhantomData,
    }
}

/// An effect that resolves to a fixed, already-known [`Failure`]. See [`fail_with`].
pub struct FailWith<A, E> {
    failure: Failure<E>,
    _marker: PhantomData<fn() -> A>,
}

impl<A, E: fmt::Debug> fmt::Debug for FailWith<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FailWith").field(&self.failure).finish()
    }
}

impl<A: Send, E: Send> MicroEffect for FailWith<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        Err(self.failure)
    }
}

/// An effect that resolves to the given `failure` directly, bypassing the
/// `Expected`/`Unexpected`/`Aborted` construction helpers.
pub fn fail_with<A: Send, E: Send>(failure: Failure<E>) -> FailWith<A, E> {
    FailWith {
        failure,
        _marker: PhantomData,
    }
}

/// An effect wrapping a synchronous, possibly-panicking closure. See [`sync`].
pub struct Sync<F, A, E> {
    thunk: F,
    _marker: PhantomData<fn() -> (A, E)>,
}

impl<F, A, E> fmt::Debug for Sync<F, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sync").field("thunk", &"<closure>").finish()
    }
}

impl<F, A, E> MicroEffect for Sync<F, A, E>
where
    F: FnOnce() -> A + Send,
    A: Send,
    E: Send,
{
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        catch_panic(self.thunk).map_err(Failure::Unexpected)
    }
}

/// Evaluate `thunk` synchronously; a panic becomes `Unexpected`.
pub fn sync<F, A, E>(thunk: F) -> Sync<F, A, E>
where
    F: FnOnce() -> A + Send,
    A: Send,
    E: Send,
{
    Sync {
        thunk,
        _marker: PhantomData,
    }
}

/// An effect wrapping an already-computed `Result`. See [`from_result`].
pub struct FromResult<A, E> {
    result: Result<A, E>,
}

impl<A: fmt::Debug, E: fmt::Debug> fmt::Debug for FromResult<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FromResult").field(&self.result).finish()
    }
}

impl<A: Send, E: Send> MicroEffect for FromResult<A, E> {
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        self.result.map_err(Failure::Expected)
    }
}

/// Lift a plain `Result`: `Ok` succeeds, `Err` becomes an expected failure.
pub fn from_result<A: Send, E: Send>(result: Result<A, E>) -> FromResult<A, E> {
    FromResult { result }
}

/// An effect wrapping an `Option`. See [`from_option`].
pub struct FromOption<A, E, F> {
    option: Option<A>,
    on_none: F,
    _marker: PhantomData<fn() -> E>,
}

impl<A: fmt::Debug, E, F> fmt::Debug for FromOption<A, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromOption").field("option", &self.option).finish()
    }
}

impl<A, E, F> MicroEffect for FromOption<A, E, F>
where
    A: Send,
    E: Send,
    F: FnOnce() -> E + Send,
{
    type Output = A;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<A, E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        match self.option {
            Some(a) => Ok(a),
            None => Err(Failure::Expected((self.on_none)())),
        }
    }
}

/// Lift an `Option`: `Some` succeeds, `None` becomes an expected failure built
/// from `on_none`. Absence is treated as a typed, already-anticipated
/// outcome, so it becomes `Expected`, never `Unexpected` or `Aborted`.
pub fn from_option<A: Send, E: Send, F: FnOnce() -> E + Send>(
    option: Option<A>,
    on_none: F,
) -> FromOption<A, E, F> {
    FromOption {
        option,
        on_none,
        _marker: PhantomData,
    }
}

/// An effect wrapping an [`Either`]. See [`from_either`].
pub struct FromEither<L, R> {
    either: Either<L, R>,
}

impl<L: fmt::Debug, R: fmt::Debug> fmt::Debug for FromEither<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FromEither").field(&self.either).finish()
    }
}

impl<L: Send, R: Send> MicroEffect for FromEither<L, R> {
    type Output = R;
    type Error = L;

    async fn run(self, env: &Env) -> MicroResult<R, L> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        match self.either {
            Either::Right(r) => Ok(r),
            Either::Left(l) => Err(Failure::Expected(l)),
        }
    }
}

/// Lift an [`Either`]: `Right` succeeds, `Left` becomes an expected failure.
pub fn from_either<L: Send, R: Send>(either: Either<L, R>) -> FromEither<L, R> {
    FromEither { either }
}

/// An effect deferring construction of an inner effect to run time. See [`suspend`].
pub struct Suspend<F, Next> {
    thunk: F,
    _marker: PhantomData<fn() -> Next>,
}

impl<F, Next> fmt::Debug for Suspend<F, Next> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspend").field("thunk", &"<closure>").finish()
    }
}

impl<F, Next> MicroEffect for Suspend<F, Next>
where
    F: FnOnce() -> Next + Send,
    Next: MicroEffect,
{
    type Output = Next::Output;
    type Error = Next::Error;

    async fn run(self, env: &Env) -> MicroResult<Next::Output, Next::Error> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        match catch_panic(self.thunk) {
            Ok(next) => next.run(env).await,
            Err(defect) => Err(Failure::Unexpected(defect)),
        }
    }
}

/// Defer construction of an effect until run time, catching panics raised
/// while building it (as opposed to panics raised while running it).
pub fn suspend<F, Next>(thunk: F) -> Suspend<F, Next>
where
    F: FnOnce() -> Next + Send,
    Next: MicroEffect,
{
    Suspend {
        thunk,
        _marker: PhantomData,
    }
}

/// An effect reading a required service out of the current context. See [`service`].
pub struct Service<T> {
    tag: Tag<T>,
}

impl<T> fmt::Debug for Service<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Service").field(&self.tag).finish()
    }
}

impl<T: Send + Sync + 'static> MicroEffect for Service<T> {
    type Output = std::sync::Arc<T>;
    type Error = ServiceNotFound;

    async fn run(self, env: &Env) -> MicroResult<std::sync::Arc<T>, ServiceNotFound> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        env.context().require(self.tag).map_err(Failure::Expected)
    }
}

/// Read the service bound to `tag` out of the current context, failing with
/// [`ServiceNotFound`] if it is absent.
pub fn service<T: Send + Sync + 'static>(tag: Tag<T>) -> Service<T> {
    Service { tag }
}
