//! # micro-effect
//!
//! A minimal, cancellation-aware effect runtime: composable [`Effect`] values
//! with typed failures, scoped resources, and structured concurrency.
//!
//! An effect value of shape `(A, E)` denotes a computation that, given the
//! ambient [`Env`], eventually produces a success of type `A`, a typed
//! expected failure of type `E`, an untyped unexpected defect, or an abort.
//! Nothing runs until a [`runners`] function (or a combinator's own `.run`)
//! actually drives it.
//!
//! ```
//! use micro_effect::prelude::*;
//! use micro_effect::runners::run_sync;
//!
//! let effect = succeed::<i32, ()>(2).map(|x| x * 3);
//! assert_eq!(run_sync(effect), 6);
//! ```
//!
//! ## Layout
//!
//! - [`effect`]: the [`Effect`] trait, constructors, combinators, the
//!   interrupt model, scopes/`acquire_release`, `for_each`, and `fork`/[`Handle`].
//! - [`env`]: the copy-on-write [`Env`] and the abort controller/signal pair.
//! - [`context`]: the type-keyed service [`Context`] effects read requirements from.
//! - [`failure`]: the three-way [`Failure`] channel (`Expected`/`Unexpected`/`Aborted`).
//! - [`runners`]: entry points from plain Rust into the effect world.
//! - [`testing`]: `MockEnv` and failure-matching assertion macros for tests.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod context;
pub mod effect;
pub mod either;
pub mod env;
pub mod failure;
pub mod runners;
pub mod testing;

// Re-export the core trait and its extension methods.
pub use effect::{MicroEffect as Effect, MicroEffectExt as EffectExt};

// Re-export boxed types.
pub use effect::boxed::{BoxFuture, BoxedEffect};

// Re-export leaf constructors.
pub use effect::constructors::{
    die, fail, fail_with, from_either, from_option, from_result, service, succeed, suspend, sync,
};

// Re-export the interrupt model.
pub use effect::interrupt::{interruptible, uninterruptible, uninterruptible_mask};

// Re-export scope & bracket.
pub use effect::bracket::{acquire_release, acquire_use_release};
pub use effect::scope::{scoped, Scope, ScopeExit};

// Re-export iteration.
pub use effect::iteration::{bounded, for_each, for_each_discard, unbounded};

// Re-export fork & handle.
pub use effect::handle::{fork, fork_daemon, Handle};

// Re-export tracing (when the feature is enabled).
#[cfg(feature = "tracing")]
pub use effect::tracing::MicroEffectTracingExt as EffectTracingExt;

// Other re-exports.
pub use context::{Context, Tag};
pub use either::Either;
pub use env::Env;
pub use failure::{Defect, Failure, MicroResult};
pub use runners::{run_fork, run_promise, run_sync, run_sync_result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::effect::prelude::*;
    pub use crate::either::Either;
    pub use crate::testing::MockEnv;
    pub use crate::{assert_aborted, assert_expected, assert_unexpected};
}
