use std::fmt;

use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use crate::effect::guard::catch_panic;
use crate::effect::trait_def::MicroEffect;

/// Sequence two effects, feeding the first's output into a function that
/// builds the second. See [`crate::effect::ext::MicroEffectExt::flat_map`].
pub struct FlatMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> fmt::Debug for FlatMap<Inner, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatMap").field("f", &"<closure>").finish()
    }
}

impl<Inner, F, Next> MicroEffect for FlatMap<Inner, F>
where
    Inner: MicroEffect,
    F: FnOnce(Inner::Output) -> Next + Send,
    Next: MicroEffect<Error = Inner::Error>,
{
    type Output = Next::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<Next::Output, Inner::Error> {
        match self.inner.run(env).await {
            Ok(a) => match catch_panic(move || (self.f)(a)) {
                Ok(next) => next.run(env).await,
                Err(defect) => Err(Failure::Unexpected(defect)),
            },
            Err(e) => Err(e),
        }
    }
}
