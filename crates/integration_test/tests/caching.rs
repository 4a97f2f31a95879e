//! Recomputation only happens for invalidated values and their dependents.

use resgraph::Resources;
use resgraph_integration_test::{B, H};

#[test]
fn recomputes_exactly_what_was_invalidated() {
    let resources = Resources::new();

    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.0(B2,H1.0(B1,H0.0(B0,_)))"
    );
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.0(B2,H1.0(B1,H0.0(B0,_)))"
    );

    resources.invalidate::<H>(&2);
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.1(B2,H1.0(B1,H0.0(B0,_)))"
    );

    resources.invalidate::<H>(&1);
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.2(B2,H1.1(B1,H0.0(B0,_)))"
    );
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.2(B2,H1.1(B1,H0.0(B0,_)))"
    );

    resources.invalidate::<B>(&2);
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.3(B2,H1.1(B1,H0.0(B0,_)))"
    );
    assert_eq!(resources.get::<H>(&1).unwrap(), "H1.1(B1,H0.0(B0,_))");

    resources.invalidate::<B>(&0);
    resources.invalidate::<B>(&1);
    resources.invalidate::<B>(&2);
    resources.invalidate::<H>(&1);

    assert_eq!(resources.get::<B>(&0).unwrap(), "B0");
    assert_eq!(resources.get::<H>(&0).unwrap(), "H0.1(B0,_)");
    assert_eq!(resources.get::<H>(&1).unwrap(), "H1.2(B1,H0.1(B0,_))");
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.4(B2,H1.2(B1,H0.1(B0,_)))"
    );
    assert_eq!(resources.get::<H>(&1).unwrap(), "H1.2(B1,H0.1(B0,_))");
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.4(B2,H1.2(B1,H0.1(B0,_)))"
    );

    resources.invalidate::<H>(&2);
    assert_eq!(
        resources.get::<H>(&2).unwrap(),
        "H2.5(B2,H1.2(B1,H0.1(B0,_)))"
    );
}
