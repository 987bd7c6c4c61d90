//! The core `MicroEffect` trait: the foundation of the runtime's zero-cost
//! effect system.
//!
//! Combinators are concrete, usually zero-sized, types rather than boxed trait
//! objects (see [`crate::effect::boxed`] for the escape hatch when erasure is
//! needed). Every implementor shares the same concrete [`Env`]; `Env` is not a
//! per-effect associated type. Requirements are resolved dynamically through
//! the environment's [`crate::context::Context`] instead (see DESIGN.md, Open
//! Question resolutions).

use std::future::Future;

use crate::env::Env;
use crate::failure::MicroResult;

/// A deferred, composable, cancellation-aware computation.
///
/// Running the same effect value twice with the same environment is allowed
/// and independent: an effect is a plain value, not a promise that has already
/// started.
pub trait MicroEffect: Sized + Send {
    /// The success type produced by this effect.
    type Output: Send;
    /// The typed, expected failure type this effect may produce.
    type Error: Send;

    /// Run this effect, resolving to exactly one [`MicroResult`].
    fn run(self, env: &Env) -> impl Future<Output = MicroResult<Self::Output, Self::Error>> + Send;
}
