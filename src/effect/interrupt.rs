//! Interruptibility masks: `uninterruptible`, `uninterruptible_mask`, and
//! `interruptible`.

use std::fmt;

use crate::env::Env;
use crate::failure::MicroResult;

use super::trait_def::MicroEffect;

/// Installs `interruptible = false` and a fresh, unlinked abort
/// controller/signal for the duration of `inner`, so an outer abort cannot
/// reach it. See [`uninterruptible`].
pub struct Uninterruptible<Inner> {
    inner: Inner,
}

impl<Inner> fmt::Debug for Uninterruptible<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uninterruptible").finish()
    }
}

impl<Inner: MicroEffect> MicroEffect for Uninterruptible<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<Inner::Output, Inner::Error> {
        let inner_env = env.with_fresh_uninterruptible_signal();
        self.inner.run(&inner_env).await
    }
}

/// Run `inner` uninterruptibly: a pending outer abort does not reach it, and
/// it does not observe any abort fired while it runs.
pub fn uninterruptible<Inner: MicroEffect>(inner: Inner) -> Uninterruptible<Inner> {
    Uninterruptible { inner }
}

/// A capability, handed to the body of a [`uninterruptible_mask`], that
/// re-exposes the environment from just before the mask was installed.
///
/// If the outer region was already interruptible, `restore(e)` runs `e`
/// observing the outer signal and interruptibility again. If the outer
/// region was itself uninterruptible, `restore` is the identity: the
/// "outer" environment it captured is already uninterruptible.
#[derive(Clone)]
pub struct Restore {
    outer_env: Env,
}

impl Restore {
    /// Run `inner` under the environment captured just before the enclosing
    /// mask was installed.
    pub fn restore<Inner: MicroEffect>(&self, inner: Inner) -> Restored<Inner> {
        Restored {
            inner,
            outer_env: self.outer_env.clone(),
        }
    }
}

/// The effect produced by [`Restore::restore`]. See [`Restore`].
pub struct Restored<Inner> {
    inner: Inner,
    outer_env: Env,
}

impl<Inner> fmt::Debug for Restored<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restored").finish()
    }
}

impl<Inner: MicroEffect> MicroEffect for Restored<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run(self, _env: &Env) -> MicroResult<Inner::Output, Inner::Error> {
        self.inner.run(&self.outer_env).await
    }
}

/// Like [`uninterruptible`], but hands the body a [`Restore`] capability so a
/// sub-region can opt back into the outer interruptibility. This is the
/// minimum construct needed to run *acquire* and *release* uncancellably
/// while still allowing *use* to be cancelled (see
/// [`crate::effect::bracket::acquire_use_release`]).
pub struct UninterruptibleMask<F> {
    f: F,
}

impl<F> fmt::Debug for UninterruptibleMask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UninterruptibleMask").finish()
    }
}

impl<F, Next> MicroEffect for UninterruptibleMask<F>
where
    F: FnOnce(Restore) -> Next + Send,
    Next: MicroEffect,
{
    type Output = Next::Output;
    type Error = Next::Error;

    async fn run(self, env: &Env) -> MicroResult<Next::Output, Next::Error> {
        let restore = Restore {
            outer_env: env.clone(),
        };
        let inner_env = env.with_fresh_uninterruptible_signal();
        let next = (self.f)(restore);
        next.run(&inner_env).await
    }
}

/// Run `f`'s result uninterruptibly, handing `f` a [`Restore`] capability to
/// re-expose the outer interruptibility for a nested sub-region.
pub fn uninterruptible_mask<F, Next>(f: F) -> UninterruptibleMask<F>
where
    F: FnOnce(Restore) -> Next + Send,
    Next: MicroEffect,
{
    UninterruptibleMask { f }
}

/// Forces `interruptible = true` for the duration of `inner`, observing
/// whichever abort controller/signal is already installed in the
/// environment. The inverse of [`uninterruptible`].
pub struct Interruptible<Inner> {
    inner: Inner,
}

impl<Inner> fmt::Debug for Interruptible<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interruptible").finish()
    }
}

impl<Inner: MicroEffect> MicroEffect for Interruptible<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<Inner::Output, Inner::Error> {
        let inner_env = env.with_interruptible(true);
        self.inner.run(&inner_env).await
    }
}

/// Restore interruptibility for `inner`, re-exposing the current controller's
/// signal.
pub fn interruptible<Inner: MicroEffect>(inner: Inner) -> Interruptible<Inner> {
    Interruptible { inner }
}
