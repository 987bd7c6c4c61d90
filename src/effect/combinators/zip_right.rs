use std::fmt;

use crate::env::Env;
use crate::failure::MicroResult;

use crate::effect::trait_def::MicroEffect;

/// Sequence `inner` then `that`, keeping `that`'s value.
/// See [`crate::effect::ext::MicroEffectExt::zip_right`].
pub struct ZipRight<Inner, That> {
    pub(crate) inner: Inner,
    pub(crate) that: That,
}

impl<Inner, That> fmt::Debug for ZipRight<Inner, That> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipRight").finish()
    }
}

impl<Inner, That> MicroEffect for ZipRight<Inner, That>
where
    Inner: MicroEffect,
    That: MicroEffect<Error = Inner::Error>,
{
    type Output = That::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<That::Output, Inner::Error> {
        match self.inner.run(env).await {
            Ok(_) => self.that.run(env).await,
            Err(e) => Err(e),
        }
    }
}
