//! The three-way failure channel: expected errors, unexpected defects, and abort.
//!
//! Every effect resolves to `Result<A, Failure<E>>`. Combinators short-circuit on
//! any `Failure` variant; only a reifier like [`crate::effect::ext::MicroEffectExt::as_result`]
//! turns a `Failure` back into ordinary data.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque payload carried by [`Failure::Unexpected`].
///
/// Wraps either a value passed to `die()` or a caught panic payload. `Defect` is
/// cheap to clone (an `Arc` underneath) since a single defect may need to be
/// replayed to several observers of a forked [`crate::effect::handle::Handle`].
#[derive(Clone)]
pub struct Defect(Arc<dyn Any + Send + Sync>);

impl Defect {
    /// Wrap an arbitrary value as a defect.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Defect(Arc::new(value))
    }

    /// Convert a caught `std::panic::catch_unwind` payload into a defect.
    ///
    /// Panic payloads are `Box<dyn Any + Send>`, not `Sync`; the common cases
    /// (`&str` / `String`) are extracted and stored as an owned `String` so the
    /// defect itself stays `Send + Sync`. Anything else is reduced to a message.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            Defect::new((*s).to_string())
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Defect::new(s.clone())
        } else {
            Defect::new("panicked with a non-string payload".to_string())
        }
    }

    /// Attempt to downcast the defect back to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            write!(f, "Defect({:?})", s)
        } else {
            write!(f, "Defect(<opaque>)")
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            write!(f, "{}", s)
        } else {
            write!(f, "<opaque defect>")
        }
    }
}

/// The three ways an effect can fail.
#[derive(Clone)]
pub enum Failure<E> {
    /// A typed, recoverable domain failure produced by `fail`/`fromEither(Left)`/`fromOption(None)`.
    Expected(E),
    /// A thrown/panicked value that escaped the typed channel.
    Unexpected(Defect),
    /// Cancellation/interruption.
    Aborted,
}

impl<E> Failure<E> {
    /// `true` for `Expected`.
    pub fn is_expected(&self) -> bool {
        matches!(self, Failure::Expected(_))
    }

    /// `true` for `Unexpected`.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Failure::Unexpected(_))
    }

    /// `true` for `Aborted`.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Failure::Aborted)
    }

    /// The expected error, if this is `Expected`.
    pub fn expected(self) -> Option<E> {
        match self {
            Failure::Expected(e) => Some(e),
            _ => None,
        }
    }

    /// Map the expected-error channel, leaving `Unexpected`/`Aborted` untouched.
    pub fn map_expected<E2>(self, f: impl FnOnce(E) -> E2) -> Failure<E2> {
        match self {
            Failure::Expected(e) => Failure::Expected(f(e)),
            Failure::Unexpected(d) => Failure::Unexpected(d),
            Failure::Aborted => Failure::Aborted,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Expected(e) => f.debug_tuple("Expected").field(e).finish(),
            Failure::Unexpected(d) => f.debug_tuple("Unexpected").field(d).finish(),
            Failure::Aborted => write!(f, "Aborted"),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Expected(e) => write!(f, "{}", e),
            Failure::Unexpected(d) => write!(f, "unexpected defect: {}", d),
            Failure::Aborted => write!(f, "aborted"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Failure<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Failure::Expected(e) => Some(e),
            Failure::Unexpected(_) | Failure::Aborted => None,
        }
    }
}

impl<E: PartialEq> PartialEq for Failure<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Failure::Expected(a), Failure::Expected(b)) => a == b,
            (Failure::Aborted, Failure::Aborted) => true,
            // Unexpected defects are not compared structurally: two panics with
            // identical messages are not necessarily "the same" failure.
            _ => false,
        }
    }
}

/// The result of running an effect: success, or one of the three failure kinds.
pub type MicroResult<A, E> = Result<A, Failure<E>>;

/// Marker wrapped in a [`Defect`] to stand in for `Failure::Aborted` wherever a
/// caller needs every failure kind reduced to a single `Defect` channel (scope
/// finalizer bookkeeping, `run_promise`'s squashed rejection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortedSentinel;

impl fmt::Display for AbortedSentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aborted")
    }
}

/// Reduce any [`Failure`] to a single [`Defect`] channel: `Expected`/`Unexpected`
/// carry their payload through, `Aborted` becomes [`AbortedSentinel`].
pub fn erase_failure<E: fmt::Debug + Send + Sync + 'static>(failure: Failure<E>) -> Defect {
    match failure {
        Failure::Expected(e) => Defect::new(e),
        Failure::Unexpected(d) => d,
        Failure::Aborted => Defect::new(AbortedSentinel),
    }
}
