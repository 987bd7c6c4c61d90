use std::fmt;
use std::marker::PhantomData;

use crate::env::Env;
use crate::failure::MicroResult;

use crate::effect::trait_def::MicroEffect;

/// Replace the success value with a constant. See
/// [`crate::effect::ext::MicroEffectExt::as_value`] and
/// [`crate::effect::ext::MicroEffectExt::as_void`].
pub struct As<Inner, B> {
    pub(crate) inner: Inner,
    pub(crate) value: B,
}

impl<Inner, B> fmt::Debug for As<Inner, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("As").finish()
    }
}

impl<Inner, B> MicroEffect for As<Inner, B>
where
    Inner: MicroEffect,
    B: Send,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<B, Inner::Error> {
        self.inner.run(env).await.map(|_| self.value)
    }
}

/// Discard the success value, replacing it with `()`.
pub struct AsVoid<Inner> {
    pub(crate) inner: Inner,
    pub(crate) _marker: PhantomData<()>,
}

impl<Inner> fmt::Debug for AsVoid<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsVoid").finish()
    }
}

impl<Inner> MicroEffect for AsVoid<Inner>
where
    Inner: MicroEffect,
{
    type Output = ();
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<(), Inner::Error> {
        self.inner.run(env).await.map(|_| ())
    }
}
