//! Overriding resource definitions with closures, functions and constants.

use resgraph::Resources;
use resgraph_integration_test::{A, B, C, D, E, F, not_f};

#[test]
fn overrides_replace_definitions() {
    let not_c = "not_C";

    let resources = Resources::builder()
        .with_override::<A, _>(|_, _| Ok("not_A".to_owned()))
        .with_override::<C, _>(move |_, &x| Ok(format!("{not_c}{x}")))
        .with_override::<D, _>(|_, (s, t)| Ok(format!("not_D{s}{t}")))
        .with_seed::<E>("not_E".to_owned())
        .with_override::<F, _>(not_f)
        .build();

    assert_eq!(resources.get::<A>(&()).unwrap(), "not_A");
    assert_eq!(resources.get::<B>(&1).unwrap(), "B1");
    assert_eq!(resources.get::<C>(&1).unwrap(), "not_C1");
    assert_eq!(resources.get::<C>(&2).unwrap(), "not_C2");
    assert_eq!(
        resources.get::<D>(&("foo".to_owned(), 2)).unwrap(),
        "not_Dfoo2"
    );
    assert_eq!(
        resources.get::<D>(&("foo".to_owned(), 3)).unwrap(),
        "not_Dfoo3"
    );
    assert_eq!(resources.get::<E>(&(1, 2)).unwrap(), "not_E");
    assert_eq!(resources.get::<F>(&"oo".to_owned()).unwrap(), "not_Foo");
}

#[test]
fn overrides_record_their_dependencies() {
    let resources = Resources::builder()
        .with_override::<C, _>(|deps, &x| {
            Ok(format!("wrapped({})", deps.get::<B>(&x)?))
        })
        .build();

    assert_eq!(resources.get::<C>(&4).unwrap(), "wrapped(B4)");
    assert_eq!(
        resources.dependents(resources.key::<B>(&4)),
        vec![resources.key::<C>(&4)]
    );

    assert_eq!(resources.invalidate::<B>(&4), 2);
}

#[test]
fn overrides_do_not_leak_between_engines() {
    let overridden = Resources::builder()
        .with_override::<B, _>(|_, &x| Ok(format!("b{x}")))
        .build();
    let plain = Resources::new();

    assert_eq!(overridden.get::<C>(&1).unwrap(), "C1(b1,_)");
    assert_eq!(plain.get::<C>(&1).unwrap(), "C1(B1,_)");
}
