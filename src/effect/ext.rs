//! Extension trait providing combinator methods for all [`MicroEffect`]s:
//! one inherent-looking method per combinator type, each returning a
//! concrete, usually zero-sized, wrapper rather than a boxed trait object.

use std::marker::PhantomData;
use std::time::Duration;

use super::combinators::as_::{As, AsVoid};
use super::combinators::as_result::AsResult;
use super::combinators::flat_map::FlatMap;
use super::combinators::map::Map;
use super::combinators::sleep::{sleep, Sleep};
use super::combinators::tap::Tap;
use super::combinators::zip_right::ZipRight;
use super::trait_def::MicroEffect;

/// Extension trait providing combinator methods for all [`MicroEffect`]s.
///
/// Blanket-implemented for every `MicroEffect`; you never implement this
/// yourself.
pub trait MicroEffectExt: MicroEffect + Sized {
    /// Transform the success value. Propagates failures unchanged.
    fn map<B, F>(self, f: F) -> Map<Self, F>
    where
        F: FnOnce(Self::Output) -> B + Send,
        B: Send,
    {
        Map { inner: self, f }
    }

    /// Sequence two effects, feeding this effect's output into `f`, which
    /// builds the next one. Rust's static typing already distinguishes "a
    /// value" from "an effect" at compile time, so there is no separate
    /// dynamically-dispatched variant.
    fn flat_map<F, Next>(self, f: F) -> FlatMap<Self, F>
    where
        F: FnOnce(Self::Output) -> Next + Send,
        Next: MicroEffect<Error = Self::Error>,
    {
        FlatMap { inner: self, f }
    }

    /// Alias for [`MicroEffectExt::flat_map`].
    fn and_then<F, Next>(self, f: F) -> FlatMap<Self, F>
    where
        F: FnOnce(Self::Output) -> Next + Send,
        Next: MicroEffect<Error = Self::Error>,
    {
        self.flat_map(f)
    }

    /// Run a side-effecting continuation on success, discarding its value but
    /// keeping the original result. If the side effect fails, that failure
    /// replaces the original success.
    fn tap<F, Side>(self, f: F) -> Tap<Self, F>
    where
        Self::Output: Clone,
        F: FnOnce(&Self::Output) -> Side + Send,
        Side: MicroEffect<Error = Self::Error>,
    {
        Tap { inner: self, f }
    }

    /// Sequence `self` then `that`, keeping `that`'s value.
    fn zip_right<That>(self, that: That) -> ZipRight<Self, That>
    where
        That: MicroEffect<Error = Self::Error>,
    {
        ZipRight { inner: self, that }
    }

    /// Replace the success value with a constant.
    fn as_value<B: Send>(self, value: B) -> As<Self, B> {
        As { inner: self, value }
    }

    /// Discard the success value, replacing it with `()`.
    fn as_void(self) -> AsVoid<Self> {
        AsVoid {
            inner: self,
            _marker: PhantomData,
        }
    }

    /// Reify this effect's [`crate::failure::MicroResult`] as an
    /// always-succeeding effect. Never fails.
    fn as_result(self) -> AsResult<Self> {
        AsResult { inner: self }
    }

    /// `zipRight(sleep(duration), self)`: wait `duration`, then run `self`.
    fn delay(self, duration: Duration) -> ZipRight<Sleep<Self::Error>, Self>
    where
        Self::Error: Send,
    {
        ZipRight {
            inner: sleep(duration),
            that: self,
        }
    }
}

impl<Eff: MicroEffect> MicroEffectExt for Eff {}
