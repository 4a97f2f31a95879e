//! `update` and `mutate`.

use resgraph::Resources;
use resgraph_integration_test::{B, C, Camera, Counter, View};

#[test]
fn repeated_updates_recompute_dependents_once() {
    let counter = Counter::default();

    let resources = {
        let counter = counter.clone();

        Resources::builder()
            .with_override::<C, _>(move |deps, &x| {
                counter.bump();
                Ok(format!("C{x}({})", deps.get::<B>(&x)?))
            })
            .build()
    };

    assert_eq!(resources.get::<C>(&1).unwrap(), "C1(B1)");
    assert_eq!(counter.get(), 1);

    for _ in 0..3 {
        assert_eq!(resources.update::<B>(&1).unwrap(), "B1");
    }

    // B1 is cached again, C1 waits for its next request
    assert!(resources.contains(resources.key::<B>(&1)));
    assert!(!resources.contains(resources.key::<C>(&1)));
    assert_eq!(counter.get(), 1);

    assert_eq!(resources.get::<C>(&1).unwrap(), "C1(B1)");
    assert_eq!(counter.get(), 2);
}

#[test]
fn mutation_is_published_when_the_guard_drops() {
    let resources =
        Resources::builder().with_seed::<Camera>(Camera::handle(1)).build();
    let main = "main".to_owned();

    assert_eq!(resources.get::<View>(&main).unwrap(), "main@1");

    {
        let camera = resources.mutate::<Camera>(&()).unwrap();
        camera.lock().zoom = 3;

        assert_eq!(resources.get::<View>(&main).unwrap(), "main@1");
    }

    assert!(!resources.contains(resources.key::<View>(&main)));
    assert_eq!(resources.get::<View>(&main).unwrap(), "main@3");
}

#[test]
fn clear_purges_everything() {
    let resources = Resources::new();

    resources.get::<C>(&2).unwrap();
    assert_eq!(resources.clear(), 5);
    assert!(resources.is_empty());

    assert_eq!(resources.get::<C>(&2).unwrap(), "C2(B2,C1(B1,_))");
    assert_eq!(resources.statistics().purged, 5);
}
