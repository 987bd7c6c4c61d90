//! Testing utilities for code built on [`crate::effect`].
//!
//! A chain-builder (`MockEnv`) that builds a [`crate::env::Env`] fixture,
//! since every effect test needs one to call `.run(&env)` against, plus one
//! assertion macro per [`crate::failure::Failure`] variant.

use crate::context::{Context, Tag};
use crate::env::{Concurrency, Env};

/// Builder for an [`Env`] fixture, for tests that need more than
/// [`Env::root`]'s defaults.
///
/// # Example
///
/// ```
/// use micro_effect::context::Tag;
/// use micro_effect::testing::MockEnv;
///
/// static GREETING: Tag<String> = Tag::new("test/greeting");
///
/// let env = MockEnv::new()
///     .with_service(GREETING, "hello".to_string())
///     .with_concurrency_bound(4)
///     .build();
///
/// assert_eq!(*env.context().get(GREETING).unwrap(), "hello");
/// ```
#[derive(Debug)]
pub struct MockEnv {
    env: Env,
}

impl MockEnv {
    /// Start from [`Env::root`]: a fresh, unaborted, interruptible root.
    pub fn new() -> Self {
        MockEnv { env: Env::root() }
    }

    /// Bind `value` under `tag` in the environment's service [`Context`].
    pub fn with_service<T: Send + Sync + 'static>(mut self, tag: Tag<T>, value: T) -> Self {
        self.env = self.env.with_context(self.env.context().add(tag, value));
        self
    }

    /// Replace the environment's whole [`Context`] outright.
    pub fn with_context(mut self, context: Context) -> Self {
        self.env = self.env.with_context(context);
        self
    }

    /// Set the ambient concurrency to a fixed bound.
    pub fn with_concurrency_bound(mut self, n: usize) -> Self {
        let concurrency = std::num::NonZeroUsize::new(n)
            .map(Concurrency::Bounded)
            .unwrap_or(Concurrency::Sequential);
        self.env = self.env.with_concurrency(concurrency);
        self
    }

    /// Set the ambient concurrency to unbounded.
    pub fn with_unbounded_concurrency(mut self) -> Self {
        self.env = self.env.with_concurrency(Concurrency::Unbounded);
        self
    }

    /// Disable interruptibility on the built environment.
    pub fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.env = self.env.with_interruptible(interruptible);
        self
    }

    /// Fire this fixture's abort controller before handing the environment
    /// back, for tests exercising the pre-abort check in
    /// [`crate::effect::constructors`]'s guards.
    pub fn aborted(self) -> Self {
        self.env.abort_controller().abort();
        self
    }

    /// Build the final [`Env`].
    pub fn build(self) -> Env {
        self.env
    }
}

impl Default for MockEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert that a [`crate::failure::MicroResult`] is `Err(Failure::Expected(_))`,
/// optionally matching the carried error.
#[macro_export]
macro_rules! assert_expected {
    ($result:expr) => {
        match $result {
            Err($crate::failure::Failure::Expected(_)) => {}
            other => panic!("expected Err(Failure::Expected(_)), got {other:?}"),
        }
    };
    ($result:expr, $error:expr) => {
        match $result {
            Err($crate::failure::Failure::Expected(e)) => assert_eq!(e, $error),
            other => panic!("expected Err(Failure::Expected({:?})), got {other:?}", $error),
        }
    };
}

/// Assert that a [`crate::failure::MicroResult`] is `Err(Failure::Unexpected(_))`.
#[macro_export]
macro_rules! assert_unexpected {
    ($result:expr) => {
        match $result {
            Err($crate::failure::Failure::Unexpected(_)) => {}
            other => panic!("expected Err(Failure::Unexpected(_)), got {other:?}"),
        }
    };
}

/// Assert that a [`crate::failure::MicroResult`] is `Err(Failure::Aborted)`.
#[macro_export]
macro_rules! assert_aborted {
    ($result:expr) => {
        match $result {
            Err($crate::failure::Failure::Aborted) => {}
            other => panic!("expected Err(Failure::Aborted), got {other:?}"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::{fail, sync};
    use crate::effect::trait_def::MicroEffect;
    use crate::failure::Failure;

    static GREETING: Tag<String> = Tag::new("test/greeting");

    #[tokio::test]
    async fn mock_env_installs_a_service() {
        let env = MockEnv::new().with_service(GREETING, "hi".to_string()).build();
        assert_eq!(*env.context().get(GREETING).unwrap(), "hi".to_string());
    }

    #[tokio::test]
    async fn mock_env_aborted_short_circuits_interruptible_effects() {
        let env = MockEnv::new().aborted().build();
        let result = sync::<_, (), ()>(|| ()).run(&env).await;
        assert_aborted!(result);
    }

    #[tokio::test]
    async fn mock_env_bounded_concurrency_is_observed() {
        let env = MockEnv::new().with_concurrency_bound(3).build();
        assert_eq!(
            env.concurrency(),
            Concurrency::Bounded(std::num::NonZeroUsize::new(3).unwrap())
        );
    }

    #[tokio::test]
    async fn assert_expected_macro_matches_error() {
        let result = fail::<(), &'static str>("boom").run(&Env::root()).await;
        assert_expected!(result, "boom");
    }

    #[test]
    fn assert_expected_macro_panics_on_mismatch() {
        let result: Result<(), Failure<&str>> = Ok(());
        let caught = std::panic::catch_unwind(|| {
            assert_expected!(result);
        });
        assert!(caught.is_err());
    }
}
