//! The effect system: a zero-cost-by-default `MicroEffect` trait plus the
//! constructors, combinators, and control structures built on it.
//!
//! Each combinator is a small concrete type implementing [`trait_def::MicroEffect`]
//! rather than a boxed trait object (zero-cost by default, with
//! [`boxed::BoxedEffect`] as an opt-in escape hatch for erasure). `run` is
//! `async fn(self, &Env) -> MicroResult<A, E>` rather than continuation-passing,
//! since `async`/`.await` already compiles to a suspendable state machine.

pub mod boxed;
pub mod bracket;
pub mod combinators;
pub mod constructors;
pub mod ext;
pub(crate) mod guard;
pub mod handle;
pub mod interrupt;
pub mod iteration;
pub mod scope;
#[cfg(feature = "tracing")]
pub mod tracing;
pub mod trait_def;

// Re-export the core trait and its extension methods.
pub use ext::MicroEffectExt;
pub use trait_def::MicroEffect;

// Re-export boxed types.
pub use boxed::{BoxFuture, BoxedEffect, BoxedExt};

// Re-export leaf constructors.
pub use constructors::{
    die, fail, fail_with, from_either, from_option, from_result, service, succeed, suspend, sync,
};

// Re-export combinators (concrete types, for advanced / trait-bound use).
pub use combinators::{
    async_effect, never, sleep, As, AsResult, AsVoid, AsyncEffect, FlatMap, Map, Never, Resume,
    Sleep, Tap, ZipRight,
};

// Re-export the interrupt model.
pub use interrupt::{interruptible, uninterruptible, uninterruptible_mask, Restore};

// Re-export scope & bracket.
pub use bracket::{acquire_release, acquire_use_release};
pub use scope::{scoped, Scope, ScopeExit, SCOPE_TAG};

// Re-export iteration.
pub use iteration::{bounded, for_each, for_each_discard, unbounded, ForEachConcurrency};

// Re-export fork & handle.
pub use handle::{fork, fork_daemon, Handle};

// Re-export tracing (when the feature is enabled).
#[cfg(feature = "tracing")]
pub use tracing::{Instrument, MicroEffectTracingExt};

/// Convenience re-exports for composing effects.
pub mod prelude {
    pub use super::bracket::{acquire_release, acquire_use_release};
    pub use super::constructors::{
        die, fail, fail_with, from_either, from_option, from_result, service, succeed, suspend,
        sync,
    };
    pub use super::combinators::{async_effect, never, sleep};
    pub use super::ext::MicroEffectExt;
    pub use super::handle::{fork, fork_daemon};
    pub use super::interrupt::{interruptible, uninterruptible, uninterruptible_mask};
    pub use super::iteration::{bounded, for_each, for_each_discard, unbounded};
    pub use super::scope::scoped;
    pub use super::trait_def::MicroEffect;
    #[cfg(feature = "tracing")]
    pub use super::tracing::MicroEffectTracingExt;
    pub use crate::env::Env;
    pub use crate::failure::{Failure, MicroResult};
}
