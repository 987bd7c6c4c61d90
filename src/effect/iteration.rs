//! `forEach`: sequential or bounded/unbounded-concurrent iteration with
//! first-failure-wins semantics.

use std::fmt;

use futures::stream::{self, StreamExt};

use crate::env::{Concurrency, Env};
use crate::failure::{Failure, MicroResult};

use super::guard::check_interrupt;
use super::trait_def::MicroEffect;

/// How a `forEach` should resolve its effective concurrency.
#[derive(Clone, Copy, Debug)]
pub enum ForEachConcurrency {
    /// Use this concurrency directly.
    Fixed(Concurrency),
    /// Consult the ambient `concurrency` reference (`Env::concurrency`).
    Inherit,
}

impl ForEachConcurrency {
    fn resolve(self, env: &Env) -> Concurrency {
        match self {
            ForEachConcurrency::Fixed(c) => c,
            ForEachConcurrency::Inherit => env.concurrency(),
        }
    }
}

impl Default for ForEachConcurrency {
    fn default() -> Self {
        ForEachConcurrency::Fixed(Concurrency::Sequential)
    }
}

/// Run `f` over `items`, in input order, waiting for each to resolve before
/// starting the next. Stops at the first failure; items after it are never
/// started.
async fn run_sequential<I, F, Eff, A, E>(items: Vec<I>, f: &F, env: &Env) -> MicroResult<Vec<A>, E>
where
    F: Fn(I) -> Eff,
    Eff: MicroEffect<Output = A, Error = E>,
{
    let mut outputs = Vec::with_capacity(items.len());
    for item in items {
        outputs.push(f(item).run(env).await?);
    }
    Ok(outputs)
}

/// Run `f` over `items` with at most `cap` in flight. The first item to
/// *report back* with a failure wins: its failure is returned, the
/// concurrency-local abort controller is triggered, and every other result is
/// discarded (though every started item still runs to completion; nothing
/// is dropped mid-flight, only its abort signal is tripped).
async fn run_concurrent<I, F, Eff, A, E>(
    items: Vec<I>,
    f: &F,
    cap: usize,
    env: &Env,
) -> MicroResult<Vec<A>, E>
where
    I: Send,
    F: Fn(I) -> Eff + Sync,
    Eff: MicroEffect<Output = A, Error = E> + Send,
    A: Send,
    E: Send,
{
    let len = items.len();
    let (child_env, child_controller) = env.with_child_controller();
    let listener = {
        let child_controller = child_controller.clone();
        env.abort_signal()
            .add_event_listener(move || child_controller.abort())
    };

    let mut outputs: Vec<Option<A>> = (0..len).map(|_| None).collect();
    let mut first_failure: Option<Failure<E>> = None;

    let mut pending = stream::iter(items.into_iter().enumerate())
        .map(|(i, item)| {
            let child_env = child_env.clone();
            async move { (i, f(item).run(&child_env).await) }
        })
        .buffer_unordered(cap.max(1));

    while let Some((i, result)) = pending.next().await {
        match result {
            Ok(a) => outputs[i] = Some(a),
            Err(failure) => {
                if first_failure.is_none() {
                    first_failure = Some(failure);
                    child_controller.abort();
                }
            }
        }
    }

    listener.remove();

    match first_failure {
        Some(failure) => Err(failure),
        None => Ok(outputs.into_iter().map(|o| o.expect("every index reported")).collect()),
    }
}

/// The effect produced by [`for_each`].
pub struct ForEach<I, F> {
    items: Vec<I>,
    f: F,
    concurrency: ForEachConcurrency,
}

impl<I, F> fmt::Debug for ForEach<I, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEach")
            .field("len", &self.items.len())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl<I, F> ForEach<I, F> {
    /// Set the concurrency this `forEach` resolves against. Defaults to
    /// [`ForEachConcurrency::Fixed(Concurrency::Sequential)`].
    pub fn concurrency(mut self, concurrency: ForEachConcurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Discard the collected outputs, keeping only the pass/fail result.
    pub fn discard(self) -> ForEachDiscard<I, F> {
        ForEachDiscard { inner: self }
    }
}

impl<I, F, Eff, A, E> MicroEffect for ForEach<I, F>
where
    I: Send + 'static,
    F: Fn(I) -> Eff + Sync + Send + 'static,
    Eff: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = Vec<A>;
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<Vec<A>, E> {
        if let Some(failure) = check_interrupt(env) {
            return Err(failure);
        }
        match self.concurrency.resolve(env) {
            Concurrency::Sequential => run_sequential(self.items, &self.f, env).await,
            Concurrency::Bounded(n) => run_concurrent(self.items, &self.f, n.get(), env).await,
            Concurrency::Unbounded => run_concurrent(self.items, &self.f, usize::MAX, env).await,
        }
    }
}

/// `forEach(items, f)` with `discard = true`: same iteration and failure
/// semantics as [`ForEach`], but the per-item outputs are dropped.
pub struct ForEachDiscard<I, F> {
    inner: ForEach<I, F>,
}

impl<I, F> fmt::Debug for ForEachDiscard<I, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEachDiscard").finish()
    }
}

impl<I, F, Eff, A, E> MicroEffect for ForEachDiscard<I, F>
where
    I: Send + 'static,
    F: Fn(I) -> Eff + Sync + Send + 'static,
    Eff: MicroEffect<Output = A, Error = E> + Send + 'static,
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = ();
    type Error = E;

    async fn run(self, env: &Env) -> MicroResult<(), E> {
        self.inner.run(env).await.map(|_| ())
    }
}

/// Iterate `items` through `f`, sequentially by default. See
/// [`ForEach::concurrency`] to run concurrently, and [`ForEach::discard`] to
/// drop the collected outputs.
pub fn for_each<I, F, Eff, A, E>(items: impl IntoIterator<Item = I>, f: F) -> ForEach<I, F>
where
    F: Fn(I) -> Eff,
    Eff: MicroEffect<Output = A, Error = E>,
{
    ForEach {
        items: items.into_iter().collect(),
        f,
        concurrency: ForEachConcurrency::default(),
    }
}

/// Shorthand for `for_each(items, f).discard()`.
pub fn for_each_discard<I, F, Eff, A, E>(
    items: impl IntoIterator<Item = I>,
    f: F,
) -> ForEachDiscard<I, F>
where
    F: Fn(I) -> Eff,
    Eff: MicroEffect<Output = A, Error = E>,
{
    for_each(items, f).discard()
}

/// Build a [`ForEachConcurrency::Fixed`] with a positive bound.
pub fn bounded(n: usize) -> ForEachConcurrency {
    match std::num::NonZeroUsize::new(n) {
        Some(n) => ForEachConcurrency::Fixed(Concurrency::Bounded(n)),
        None => ForEachConcurrency::Fixed(Concurrency::Sequential),
    }
}

/// A [`ForEachConcurrency::Fixed`] with no cap.
pub fn unbounded() -> ForEachConcurrency {
    ForEachConcurrency::Fixed(Concurrency::Unbounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::{fail, succeed, sync};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn sequential_preserves_order_and_side_effects() {
        let env = Env::root();
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_for_f = order.clone();
        let result = for_each(1..=3, move |x: i32| {
            let order = order_for_f.clone();
            sync::<_, i32, ()>(move || {
                order.lock().unwrap().push(x);
                x * 2
            })
        })
        .run(&env)
        .await;
        assert_eq!(result, Ok(vec![2, 4, 6]));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn sequential_stops_at_first_failure() {
        let env = Env::root();
        let invocations = Arc::new(AtomicUsize::new(0));
        let invocations_for_f = invocations.clone();
        let result = for_each(1..=3, move |x: i32| {
            invocations_for_f.fetch_add(1, Ordering::SeqCst);
            if x == 2 {
                fail::<i32, &'static str>("e")
            } else {
                succeed::<i32, &'static str>(x)
            }
        })
        .run(&env)
        .await;
        assert_eq!(result, Err(Failure::Expected("e")));
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_bounds_in_flight_and_preserves_index_order() {
        let env = Env::root();
        let result = for_each(0..10, |x: i32| succeed::<i32, ()>(x * x))
            .concurrency(bounded(3))
            .run(&env)
            .await
            .unwrap();
        assert_eq!(result, (0..10).map(|x| x * x).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn concurrent_reports_first_failure_and_aborts_siblings() {
        let env = Env::root();
        let result = for_each(0..5, |x: i32| {
            if x == 2 {
                fail::<(), &'static str>("boom")
            } else {
                succeed::<(), &'static str>(())
            }
        })
        .concurrency(unbounded())
        .run(&env)
        .await;
        assert_eq!(result, Err(Failure::Expected("boom")));
    }

    #[tokio::test]
    async fn discard_drops_outputs() {
        let env = Env::root();
        let result = for_each_discard(1..=3, |x: i32| succeed::<i32, ()>(x))
            .run(&env)
            .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let env = Env::root();
        let result = for_each(Vec::<i32>::new(), |x: i32| succeed::<i32, ()>(x))
            .run(&env)
            .await;
        assert_eq!(result, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn inherited_concurrency_consults_ambient_ref() {
        let env = Env::root().with_concurrency(Concurrency::Bounded(
            std::num::NonZeroUsize::new(2).unwrap(),
        ));
        let result = for_each(0..4, |x: i32| succeed::<i32, ()>(x))
            .concurrency(ForEachConcurrency::Inherit)
            .run(&env)
            .await;
        assert_eq!(result, Ok(vec![0, 1, 2, 3]));
    }
}
