use std::fmt;

use crate::env::Env;
use crate::failure::{Failure, MicroResult};

use crate::effect::guard::catch_panic;
use crate::effect::trait_def::MicroEffect;

/// Run a side-effecting continuation on success, discarding its value but
/// keeping the original result, unless the side effect itself fails, in
/// which case that failure replaces the original success.
/// See [`crate::effect::ext::MicroEffectExt::tap`].
pub struct Tap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> fmt::Debug for Tap<Inner, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap").field("f", &"<closure>").finish()
    }
}

impl<Inner, F, Side> MicroEffect for Tap<Inner, F>
where
    Inner: MicroEffect,
    Inner::Output: Clone,
    F: FnOnce(&Inner::Output) -> Side + Send,
    Side: MicroEffect<Error = Inner::Error>,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<Inner::Output, Inner::Error> {
        match self.inner.run(env).await {
            Ok(a) => {
                let side = match catch_panic({
                    let a = a.clone();
                    move || (self.f)(&a)
                }) {
                    Ok(side) => side,
                    Err(defect) => return Err(Failure::Unexpected(defect)),
                };
                match side.run(env).await {
                    Ok(_) => Ok(a),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}
