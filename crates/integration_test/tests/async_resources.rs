//! Resolution through `AsyncResources`.

use std::{sync::Arc, time::Duration};

use resgraph::{AsyncResources, Error, QueueExecutor, Resources};
use resgraph_integration_test::{
    C, Camera, Checked, Counter, Square, SquareSum, View, counted_squares,
};

fn on_queue(resources: Resources, threads: usize) -> AsyncResources {
    let executor = QueueExecutor::new(threads).unwrap();

    AsyncResources::new(Arc::new(resources), Arc::new(executor))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handles_resolve_to_values() {
    let resources = on_queue(Resources::new(), 2);

    assert_eq!(resources.get::<C>(&2).await.unwrap(), "C2(B2,C1(B1,_))");
    assert_eq!(resources.get::<Checked>(&21).await.unwrap(), 42);

    // the value landed in the shared engine
    assert!(resources.resources().contains(resources.resources().key::<C>(&1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_one_computation() {
    let counter = Counter::default();
    let resources =
        on_queue(counted_squares(&counter, Duration::from_millis(50)), 4);

    let handles = (0..8).map(|_| resources.get::<Square>(&9));
    let values = futures::future::join_all(handles).await;

    for value in values {
        assert_eq!(value.unwrap(), 81);
    }

    assert_eq!(counter.get(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failures_are_reported_through_the_handle() {
    let resources = on_queue(Resources::new(), 2);

    let error = resources.get::<Checked>(&-1).await.unwrap_err();

    assert!(matches!(error, Error::Computation(_)), "{error:?}");
    assert_eq!(error.to_string(), "negative input -1");
    assert!(resources.resources().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panics_are_reported_and_not_cached() {
    let counter = Counter::default();

    let engine = {
        let counter = counter.clone();

        Resources::builder()
            .with_override::<Square, _>(move |_, &n| {
                counter.bump();
                assert!(counter.get() > 1, "first attempt fails");

                Ok(n * n)
            })
            .build()
    };

    let resources = on_queue(engine, 1);

    let error = resources.get::<Square>(&3).await.unwrap_err();
    assert!(matches!(error, Error::TaskPanicked), "{error:?}");

    // the worker survived and the key is free again
    assert_eq!(resources.get::<Square>(&3).await.unwrap(), 9);
    assert_eq!(counter.get(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_if_ready_schedules_in_the_background() {
    let counter = Counter::default();
    let resources =
        on_queue(counted_squares(&counter, Duration::from_millis(20)), 2);

    assert_eq!(resources.get_if_ready::<Square>(&5).unwrap(), None);

    let mut value = None;

    for _ in 0..200 {
        value = resources.get_if_ready::<Square>(&5).unwrap();

        if value.is_some() {
            break;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(value, Some(25));
    assert_eq!(counter.get(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_recomputes_on_the_executor() {
    let counter = Counter::default();
    let resources =
        on_queue(counted_squares(&counter, Duration::from_millis(1)), 2);

    let sum = SquareSum { numbers: vec![1, 2] };

    assert_eq!(resources.get::<SquareSum>(&sum).await.unwrap(), 5);
    assert_eq!(counter.get(), 2);

    assert_eq!(resources.update::<Square>(&2).await.unwrap(), 4);
    assert_eq!(counter.get(), 3);

    let engine = resources.resources();
    assert!(!engine.contains(engine.key::<SquareSum>(&sum)));

    assert_eq!(resources.invalidate::<Square>(&1), 1);
    assert_eq!(resources.get::<SquareSum>(&sum).await.unwrap(), 5);
    assert_eq!(counter.get(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runs_on_a_tokio_runtime_handle() {
    let resources = AsyncResources::new(
        Arc::new(Resources::new()),
        Arc::new(tokio::runtime::Handle::current()),
    );

    assert_eq!(resources.get::<C>(&1).await.unwrap(), "C1(B1,_)");
}

#[test]
fn handles_can_be_waited_on_synchronously() {
    let resources =
        AsyncResources::with_queue_executor(Arc::new(Resources::new()))
            .unwrap();

    let handles: Vec<_> =
        (0..16).map(|n| resources.get::<Square>(&n)).collect();

    let values: Vec<u64> =
        handles.into_iter().map(|handle| handle.wait().unwrap()).collect();

    assert_eq!(values, (0..16).map(|n| n * n).collect::<Vec<u64>>());
}

#[test]
fn mutation_through_the_executor_invalidates_on_drop() {
    let engine =
        Resources::builder().with_seed::<Camera>(Camera::handle(1)).build();
    let resources = on_queue(engine, 2);
    let main = "main".to_owned();

    assert_eq!(resources.get::<View>(&main).wait().unwrap(), "main@1");

    {
        let camera = resources.mutate::<Camera>(&()).unwrap();
        camera.lock().zoom = 2;
    }

    let engine = resources.resources();
    assert!(!engine.contains(engine.key::<View>(&main)));
    assert_eq!(resources.get::<View>(&main).wait().unwrap(), "main@2");
}

#[test]
fn shut_down_executor_rejects_requests() {
    let executor = Arc::new(QueueExecutor::new(1).unwrap());
    let resources =
        AsyncResources::new(Arc::new(Resources::new()), executor.clone());

    executor.shutdown();

    let error = resources.get::<Square>(&2).wait().unwrap_err();
    assert!(matches!(error, Error::ExecutorShutdown), "{error:?}");

    let error = resources.get_if_ready::<Square>(&2).unwrap_err();
    assert!(matches!(error, Error::ExecutorShutdown), "{error:?}");
}
