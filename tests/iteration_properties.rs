//! Property-based tests for `for_each`: pick a property that should hold for
//! every input, not just the handful of fixed cases the unit tests exercise.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use micro_effect::prelude::*;

fn succeed_all(n: usize) -> Vec<i32> {
    (0..n as i32).collect()
}

proptest! {
    #[test]
    fn prop_sequential_preserves_input_order(values in prop::collection::vec(any::<i32>(), 0..64)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_for_f = order.clone();
        let expected = values.clone();

        let result = rt.block_on(
            for_each(values, move |x: i32| {
                let order = order_for_f.clone();
                sync::<_, i32, ()>(move || {
                    order.lock().unwrap().push(x);
                    x
                })
            })
            .run(&Env::root()),
        );

        prop_assert_eq!(result, Ok(expected.clone()));
        prop_assert_eq!(order.lock().unwrap().clone(), expected);
    }

    #[test]
    fn prop_sequential_stops_at_first_failure(
        len in 1usize..32,
        fail_at in 0usize..32,
    ) {
        let fail_at = fail_at % len;
        let rt = tokio::runtime::Runtime::new().unwrap();
        let invocations = Arc::new(AtomicUsize::new(0));
        let invocations_for_f = invocations.clone();

        let result = rt.block_on(
            for_each(0..len, move |x: usize| {
                invocations_for_f.fetch_add(1, Ordering::SeqCst);
                if x == fail_at {
                    fail::<(), &'static str>("e")
                } else {
                    succeed::<(), &'static str>(())
                }
            })
            .run(&Env::root()),
        );

        prop_assert_eq!(result, Err(Failure::Expected("e")));
        prop_assert_eq!(invocations.load(Ordering::SeqCst), fail_at + 1);
    }

    #[test]
    fn prop_concurrent_bounded_preserves_index_order(len in 0usize..64, cap in 1usize..16) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let items = succeed_all(len);
        let expected: Vec<i32> = items.iter().map(|x| x * x).collect();

        let result = rt.block_on(
            for_each(items, |x: i32| succeed::<i32, ()>(x * x))
                .concurrency(bounded(cap))
                .run(&Env::root()),
        );

        prop_assert_eq!(result, Ok(expected));
    }

    #[test]
    fn prop_concurrent_never_runs_more_than_cap_at_once(len in 0usize..32, cap in 1usize..8) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let items = succeed_all(len);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let in_flight_for_f = in_flight.clone();
        let max_in_flight_for_f = max_in_flight.clone();

        let result = rt.block_on(
            for_each(items, move |x: i32| {
                let in_flight = in_flight_for_f.clone();
                let max_in_flight = max_in_flight_for_f.clone();
                async_effect(move |resume, _signal| {
                    tokio::spawn(async move {
                        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_in_flight.fetch_max(current, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        resume.resume(Ok::<_, ()>(x));
                    });
                    None
                })
            })
            .concurrency(bounded(cap))
            .run(&Env::root()),
        );

        prop_assert!(result.is_ok());
        prop_assert!(max_in_flight.load(Ordering::SeqCst) <= cap);
    }
}
