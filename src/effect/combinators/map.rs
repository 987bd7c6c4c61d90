use std::fmt;

use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use crate::effect::guard::catch_panic;
use crate::effect::trait_def::MicroEffect;

/// Transform the success value. See [`crate::effect::ext::MicroEffectExt::map`].
pub struct Map<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> fmt::Debug for Map<Inner, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map").field("f", &"<closure>").finish()
    }
}

impl<Inner, F, B> MicroEffect for Map<Inner, F>
where
    Inner: MicroEffect,
    F: FnOnce(Inner::Output) -> B + Send,
    B: Send,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<B, Inner::Error> {
        match self.inner.run(env).await {
            Ok(a) => catch_panic(move || (self.f)(a)).map_err(Failure::Unexpected),
            Err(e) => Err(e),
        }
    }
}
