//! Many threads sharing one engine.

use std::{sync::Arc, time::Duration};

use resgraph::Resources;
use resgraph_integration_test::{
    B, C, Counter, Square, SquareSum, counted_squares,
};

#[test]
fn every_key_is_computed_once() {
    let counter = Counter::default();
    let resources = counted_squares(&counter, Duration::from_millis(2));

    std::thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| {
                for n in 0..32 {
                    assert_eq!(resources.get::<Square>(&n).unwrap(), n * n);
                }
            });
        }
    });

    assert_eq!(counter.get(), 32);
    assert_eq!(resources.len(), 32);
}

#[test]
fn shared_dependencies_are_computed_once() {
    let counter = Counter::default();
    let resources =
        Arc::new(counted_squares(&counter, Duration::from_millis(5)));

    let threads: Vec<_> = (0..8_u64)
        .map(|i| {
            let resources = resources.clone();

            std::thread::spawn(move || {
                let sum = SquareSum { numbers: (i..i + 8).collect() };
                let expected: u64 = (i..i + 8).map(|n| n * n).sum();

                assert_eq!(resources.get::<SquareSum>(&sum).unwrap(), expected);
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }

    // 0..15
    assert_eq!(counter.get(), 15);
}

#[test]
fn values_settle_after_concurrent_invalidation() {
    let resources = Resources::new();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    assert_eq!(
                        resources.get::<C>(&4).unwrap(),
                        "C4(B4,C3(B3,C2(B2,C1(B1,_))))"
                    );
                }
            });
        }

        scope.spawn(|| {
            for i in 0..200 {
                resources.invalidate::<B>(&(i % 4 + 1));
            }
        });
    });

    assert_eq!(
        resources.get::<C>(&4).unwrap(),
        "C4(B4,C3(B3,C2(B2,C1(B1,_))))"
    );

    // every cached value lists its dependents
    for x in 1..=4 {
        let b = resources.key::<B>(&x);
        let c = resources.key::<C>(&x);

        assert!(resources.contains(c));
        assert_eq!(resources.dependents(b), vec![c]);
    }
}
