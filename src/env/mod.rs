//! The runtime environment: a copy-on-write mapping of reference keys to values.
//!
//! Every well-known slot (context, abort controller/signal, concurrency,
//! interruptibility) is just another entry in the same map, keyed the same way
//! a caller's own [`EnvRef`] would be; there is no separate struct-of-fields
//! fast path. Deriving a new `Env` (`with`) clones the backing `im::HashMap`,
//! which is O(1) amortized thanks to structural sharing.

pub mod abort;

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use im::HashMap;

use crate::context::Context;
use abort::{AbortController, AbortSignal};

/// How many effects a concurrent `forEach` (or similarly concurrent combinator)
/// may run in flight when it consults the ambient `concurrency` reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Concurrency {
    /// Run one item at a time.
    Sequential,
    /// Run up to `n` items at a time.
    Bounded(NonZeroUsize),
    /// No cap.
    Unbounded,
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency::Sequential
    }
}

/// A typed key into an [`Env`], with a default value used when the key is
/// unset: a heterogeneous map keyed by a typed handle (identifier + phantom
/// value type).
pub struct EnvRef<T> {
    id: &'static str,
    default: fn() -> T,
}

impl<T> EnvRef<T> {
    /// Declare a new reference identified by `id`, defaulting to `default()`.
    pub const fn new(id: &'static str, default: fn() -> T) -> Self {
        EnvRef { id, default }
    }

    /// The reference's stable identifier.
    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<T: Clone + Send + Sync + 'static> EnvRef<T> {
    /// Read this reference out of `env`, falling back to the default if unset.
    pub fn get(&self, env: &Env) -> T {
        env.refs
            .get(self.id)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
            .unwrap_or_else(|| (self.default)())
    }

    /// Derive a new `Env` with this reference bound to `value`.
    pub fn set(&self, env: &Env, value: T) -> Env {
        env.with(self.id, value)
    }
}

/// The well-known reference holding the current [`Context`].
pub static CURRENT_CONTEXT: EnvRef<Context> = EnvRef::new("effect/Micro/currentContext", Context::empty);

/// The well-known reference holding the current [`AbortController`].
pub static CURRENT_ABORT_CONTROLLER: EnvRef<AbortController> =
    EnvRef::new("effect/Micro/currentAbortController", AbortController::new);

/// The well-known reference holding the current [`AbortSignal`].
pub static CURRENT_ABORT_SIGNAL: EnvRef<AbortSignal> = EnvRef::new(
    "effect/Micro/currentAbortSignal",
    default_unlinked_signal,
);

fn default_unlinked_signal() -> AbortSignal {
    AbortController::new().signal()
}

/// The well-known reference holding the current [`Concurrency`] setting.
pub static CURRENT_CONCURRENCY: EnvRef<Concurrency> =
    EnvRef::new("effect/Micro/currentConcurrency", Concurrency::default);

/// The well-known reference holding the current interruptibility flag.
pub static CURRENT_INTERRUPTIBLE: EnvRef<bool> =
    EnvRef::new("effect/Micro/currentInterruptible", default_interruptible);

fn default_interruptible() -> bool {
    true
}

/// The runtime environment threaded through every effect's `run`.
///
/// `Env` is cheap to clone (an `im::HashMap` behind the scenes) and every
/// "scoped" combinator (`uninterruptible`, `fork`, `local`, ...) derives a new,
/// independent `Env` rather than mutating the caller's.
#[derive(Clone)]
pub struct Env {
    refs: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Env {
    /// The root environment: an unbound, freshly created abort controller and
    /// all other references at their defaults. Used by the runners to seed a
    /// top-level run.
    pub fn root() -> Self {
        let controller = AbortController::new();
        let signal = controller.signal();
        Env {
            refs: HashMap::new(),
        }
        .with(CURRENT_ABORT_CONTROLLER.id(), controller)
        .with(CURRENT_ABORT_SIGNAL.id(), signal)
    }

    /// Derive a new `Env` with `id` bound to `value`.
    pub fn with<T: Send + Sync + 'static>(&self, id: &'static str, value: T) -> Env {
        let mut refs = self.refs.clone();
        refs.insert(id, Arc::new(value));
        Env { refs }
    }

    /// The current service context.
    pub fn context(&self) -> Context {
        CURRENT_CONTEXT.get(self)
    }

    /// Derive a new `Env` with `context` installed.
    pub fn with_context(&self, context: Context) -> Env {
        CURRENT_CONTEXT.set(self, context)
    }

    /// The current abort controller.
    pub fn abort_controller(&self) -> AbortController {
        CURRENT_ABORT_CONTROLLER.get(self)
    }

    /// The current abort signal.
    pub fn abort_signal(&self) -> AbortSignal {
        CURRENT_ABORT_SIGNAL.get(self)
    }

    /// The current concurrency setting.
    pub fn concurrency(&self) -> Concurrency {
        CURRENT_CONCURRENCY.get(self)
    }

    /// Derive a new `Env` with `concurrency` installed.
    pub fn with_concurrency(&self, concurrency: Concurrency) -> Env {
        CURRENT_CONCURRENCY.set(self, concurrency)
    }

    /// Whether the current region observes cancellation.
    pub fn interruptible(&self) -> bool {
        CURRENT_INTERRUPTIBLE.get(self)
    }

    /// Derive a new `Env` with `interruptible` installed.
    pub fn with_interruptible(&self, interruptible: bool) -> Env {
        CURRENT_INTERRUPTIBLE.set(self, interruptible)
    }

    /// Derive a new `Env` with a fresh, unlinked abort controller/signal pair
    /// installed and interruptibility disabled (the environment `uninterruptible`
    /// runs its body under).
    pub fn with_fresh_uninterruptible_signal(&self) -> Env {
        let (controller, signal) = AbortSignal::fresh_unlinked();
        self.with(CURRENT_ABORT_CONTROLLER.id(), controller)
            .with(CURRENT_ABORT_SIGNAL.id(), signal)
            .with_interruptible(false)
    }

    /// Derive a new `Env` for a forked child: a fresh controller whose signal
    /// is independent of the parent's, for the caller to link via
    /// [`AbortSignal::add_event_listener`] when the fork is non-daemon.
    pub fn with_child_controller(&self) -> (Env, AbortController) {
        let controller = AbortController::new();
        let signal = controller.signal();
        let env = self
            .with(CURRENT_ABORT_CONTROLLER.id(), controller.clone())
            .with(CURRENT_ABORT_SIGNAL.id(), signal);
        (env, controller)
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::root()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("refs", &self.refs.len())
            .field("interruptible", &self.interruptible())
            .field("concurrency", &self.concurrency())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_interruptible_and_unaborted() {
        let env = Env::root();
        assert!(env.interruptible());
        assert!(!env.abort_signal().aborted());
    }

    #[test]
    fn with_is_copy_on_write() {
        let base = Env::root();
        let derived = base.with_interruptible(false);
        assert!(base.interruptible());
        assert!(!derived.interruptible());
    }

    #[test]
    fn fresh_uninterruptible_signal_is_unlinked() {
        let base = Env::root();
        let inner = base.with_fresh_uninterruptible_signal();
        base.abort_controller().abort();
        assert!(base.abort_signal().aborted());
        assert!(!inner.abort_signal().aborted());
        assert!(!inner.interruptible());
    }

    #[test]
    fn child_controller_signal_is_independent_until_linked() {
        let base = Env::root();
        let (child_env, _child_controller) = base.with_child_controller();
        base.abort_controller().abort();
        assert!(!child_env.abort_signal().aborted());
    }

    #[test]
    fn unknown_ref_falls_back_to_default() {
        static COUNT: EnvRef<i32> = EnvRef::new("test/count", || 7);
        let env = Env::root();
        assert_eq!(COUNT.get(&env), 7);
        let derived = COUNT.set(&env, 9);
        assert_eq!(COUNT.get(&env), 7);
        assert_eq!(COUNT.get(&derived), 9);
    }
}
