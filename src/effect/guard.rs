//! The two mandatory guards every constructor and user-callback site applies:
//! the pre-abort check, and catch-and-convert of synchronous panics.

use std::panic::AssertUnwindSafe;

use crate::env::Env;
use crate::failure::{Defect, Failure};

/// If the environment is interruptible and already aborted, the body must not
/// run at all. Returns the failure to short-circuit with, if any.
pub(crate) fn check_interrupt<E>(env: &Env) -> Option<Failure<E>> {
    if env.interruptible() && env.abort_signal().aborted() {
        Some(Failure::Aborted)
    } else {
        None
    }
}

/// Run a synchronous user callback, converting a panic into a [`Defect`]
/// rather than letting it unwind through the effect machinery.
///
/// Uses `AssertUnwindSafe` because the closures here are one-shot (never
/// observed again after a panic), so the usual unwind-safety concern (reading
/// torn state through a `&mut`/`&` after a caught panic) does not apply.
pub(crate) fn catch_panic<A>(f: impl FnOnce() -> A) -> Result<A, Defect> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(Defect::from_panic)
}
