//! Basic resolution and dependency recording.

use resgraph::Resources;
use resgraph_integration_test::{A, B, C, D, E, F, Square, SquareSum};

#[test]
fn resolves_plain_and_recursive_resources() {
    let resources = Resources::new();

    assert_eq!(resources.get::<A>(&()).unwrap(), "A");
    assert_eq!(resources.get::<B>(&1).unwrap(), "B1");
    assert_eq!(resources.get::<B>(&2).unwrap(), "B2");
    assert_eq!(resources.get::<C>(&1).unwrap(), "C1(B1,_)");
    assert_eq!(resources.get::<C>(&2).unwrap(), "C2(B2,C1(B1,_))");
}

#[test]
fn resolves_tuple_and_string_arguments() {
    let resources = Resources::new();

    assert_eq!(resources.get::<D>(&("foo".to_owned(), 2)).unwrap(), "Dfoo2");
    assert_eq!(resources.get::<E>(&(1, 2)).unwrap(), "E12");
    assert_eq!(resources.get::<E>(&(2, 1)).unwrap(), "E21");
    assert_eq!(resources.get::<F>(&"oo".to_owned()).unwrap(), "Foo");
}

#[test]
fn records_dependency_edges() {
    let resources = Resources::new();

    resources.get::<C>(&2).unwrap();

    let c2 = resources.key::<C>(&2);
    let c1 = resources.key::<C>(&1);
    let c0 = resources.key::<C>(&0);
    let b2 = resources.key::<B>(&2);
    let b1 = resources.key::<B>(&1);

    let mut expected = vec![b2, c1];
    expected.sort();
    assert_eq!(resources.dependencies(c2), Some(expected));

    assert_eq!(resources.dependencies(c0), Some(Vec::new()));
    assert_eq!(resources.dependents(b1), vec![c1]);
    assert_eq!(resources.dependents(c1), vec![c2]);
    assert!(resources.dependents(c2).is_empty());

    // B1, B2, C0, C1, C2
    assert_eq!(resources.len(), 5);
}

#[test]
fn invalidation_purges_transitive_dependents_only() {
    let resources = Resources::new();

    resources.get::<C>(&3).unwrap();
    resources.get::<A>(&()).unwrap();

    // B1, C1, C2, C3
    assert_eq!(resources.invalidate::<B>(&1), 4);

    assert!(resources.contains(resources.key::<A>(&())));
    assert!(resources.contains(resources.key::<B>(&2)));
    assert!(resources.contains(resources.key::<C>(&0)));
    assert!(!resources.contains(resources.key::<C>(&1)));
    assert!(!resources.contains(resources.key::<C>(&3)));

    // nothing cached under this key
    assert_eq!(resources.invalidate::<B>(&1), 0);

    assert_eq!(resources.get::<C>(&3).unwrap(), "C3(B3,C2(B2,C1(B1,_)))");
}

#[test]
fn keys_are_deterministic_across_engines() {
    let first = Resources::new();
    let second = Resources::new();

    assert_eq!(first.key::<C>(&7), second.key::<C>(&7));
    assert_ne!(first.key::<C>(&7), first.key::<B>(&7));
    assert_ne!(first.key::<E>(&(1, 2)), first.key::<E>(&(2, 1)));
}

#[test]
fn derived_arguments_are_hashed_structurally() {
    let resources = Resources::new();

    let args = SquareSum { numbers: vec![1, 2, 3] };

    assert_eq!(resources.get::<SquareSum>(&args).unwrap(), 14);
    assert_eq!(
        resources.key::<SquareSum>(&args),
        resources.key::<SquareSum>(&args.clone())
    );
    assert_ne!(
        resources.key::<SquareSum>(&args),
        resources.key::<SquareSum>(&SquareSum { numbers: vec![3, 2, 1] })
    );

    // Square(2) and the sum
    assert_eq!(resources.invalidate::<Square>(&2), 2);
    assert_eq!(resources.peek::<SquareSum>(&args).unwrap(), None);
}
