//! Tracing support for the effect system: an `Instrument` combinator
//! feature-gated behind `#[cfg(feature = "tracing")]`.

use std::fmt;

use crate::env::Env;
use crate::failure::MicroResult;

use super::trait_def::MicroEffect;

/// An effect wrapped in a `tracing::Span`, entered for the duration of its
/// `run`. See [`MicroEffectTracingExt::instrument`].
pub struct Instrument<Inner> {
    pub(crate) inner: Inner,
    pub(crate) span: ::tracing::Span,
}

impl<Inner> fmt::Debug for Instrument<Inner> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument").field("span", &self.span).finish()
    }
}

impl<Inner> MicroEffect for Instrument<Inner>
where
    Inner: MicroEffect,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run(self, env: &Env) -> MicroResult<Inner::Output, Inner::Error> {
        use ::tracing::Instrument as _;
        let env = env.clone();
        let inner = self.inner;
        async move { inner.run(&env).await }.instrument(self.span).await
    }
}

/// Extension trait adding `.instrument(span)` to every [`MicroEffect`]. Only
/// available with the `tracing` feature enabled.
pub trait MicroEffectTracingExt: MicroEffect + Sized {
    /// Wrap this effect in `span`: entered when `run` starts, exited when it
    /// completes (including across any `.await` suspension points inside it).
    fn instrument(self, span: ::tracing::Span) -> Instrument<Self> {
        Instrument { inner: self, span }
    }
}

impl<Eff: MicroEffect> MicroEffectTracingExt for Eff {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::{fail, succeed};
    use crate::failure::Failure;

    #[tokio::test]
    async fn instrument_preserves_success() {
        let env = Env::root();
        let result = succeed::<i32, ()>(7)
            .instrument(::tracing::info_span!("test_span"))
            .run(&env)
            .await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn instrument_preserves_failure() {
        let env = Env::root();
        let result = fail::<i32, &str>("boom")
            .instrument(::tracing::info_span!("test_span"))
            .run(&env)
            .await;
        assert_eq!(result, Err(Failure::Expected("boom")));
    }
}
