use std::convert::Infallible;
use std::fmt;

use crate::env::Env;
use crate::failure::MicroResult;

use crate::effect::trait_def::MicroEffect;

/// Reify a `Result<A, Failure<E>>` as an always-succeeding effect. Never fails.
pub struct AsResult<Inner> {
    pub(crate) inner: Inner,
}

impl<Inner> fmt::Debug for AsResult<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsResult").finish()
    }
}

impl<Inner> MicroEffect for AsResult<Inner>
where
    Inner: MicroEffect,
{
    type Output = MicroResult<Inner::Output, Inner::Error>;
    type Error = Infallible;

    async fn run(self, env: &Env) -> MicroResult<MicroResult<Inner::Output, Inner::Error>, Infallible> {
        Ok(self.inner.run(env).await)
    }
}
