use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use crate::effect::guard::check_interrupt;
use crate::effect::trait_def::MicroEffect;

/// Schedule a one-shot timer after `duration` and resume. Sleeping is a
/// suspension point: it is one of the few places a running effect actually
/// yields to the host scheduler. See [`sleep`].
pub struct Sleep<E> {
    duration: Duration,
    _marker: PhantomData<fn() -> E>,
}

impl<E> fmt::Debug for Sleep<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sleep").field(&self.duration).finish()
    }
}

impl<E: Send> MicroEffect for Sleep<E> {
    type Output = ();
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<(), E> {
        if let Some(f) = check_interrupt(env) {
            return Err(f);
        }
        let signal = env.abort_signal();
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(()),
            _ = signal.cancelled() => Err(Failure::Aborted),
        }
    }
}

/// Suspend for `duration`, then resume successfully. Cancellable: an abort
/// fired while sleeping resolves this effect to `Err(Aborted)` instead of
/// waiting out the rest of the timer.
pub fn sleep<E: Send>(duration: Duration) -> Sleep<E> {
    Sleep {
        duration,
        _marker: PhantomData,
    }
}
