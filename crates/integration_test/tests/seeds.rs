//! Seed resources, which only exist once the host binds them.

use resgraph::{Error, Resources};
use resgraph_integration_test::{Camera, G, View};

#[test]
fn unbound_seed_fails_until_bound() {
    let broken = Resources::new();
    let okay_1 =
        Resources::builder().with_seed::<G>("good1".to_owned()).build();
    let okay_2 = Resources::builder()
        .with_override::<G, _>(|_, _| Ok("good2".to_owned()))
        .build();

    let error = broken.get::<G>(&()).unwrap_err();
    assert!(matches!(error, Error::UnboundSeed { .. }), "{error:?}");
    assert!(broken.is_empty());

    assert_eq!(okay_1.get::<G>(&()).unwrap(), "good1");
    assert_eq!(okay_2.get::<G>(&()).unwrap(), "good2");
}

#[test]
fn missing_seed_fails_dependents() {
    let resources = Resources::new();

    let error = resources.get::<View>(&"main".to_owned()).unwrap_err();

    assert!(matches!(error, Error::UnboundSeed { .. }), "{error:?}");
    assert!(error.to_string().contains("Camera"));
    assert!(resources.is_empty());
}

#[test]
fn singletons_are_shared_by_reference() {
    let camera = Camera::handle(1);

    let resources =
        Resources::builder().with_singleton::<Camera>(camera.clone()).build();

    assert_eq!(resources.get::<View>(&"main".to_owned()).unwrap(), "main@1");

    camera.lock().zoom = 4;

    // cached until the camera is invalidated
    assert_eq!(resources.get::<View>(&"main".to_owned()).unwrap(), "main@1");

    resources.invalidate::<Camera>(&());

    assert_eq!(resources.get::<View>(&"main".to_owned()).unwrap(), "main@4");
    assert!(std::sync::Arc::ptr_eq(
        &resources.get::<Camera>(&()).unwrap(),
        &camera
    ));
}
