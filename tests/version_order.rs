//! Ordering properties of release tag comparison

use std::cmp::Ordering;

use proptest::prelude::*;
use vibecraft_updater::version::{compare, is_newer};

fn tag() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0u64..4, 0u64..4, 0u64..4, any::<bool>())
            .prop_map(|(a, b, c, v)| format!("{}{a}.{b}.{c}", if v { "v" } else { "" })),
        1 => (0u64..4, 0u64..4).prop_map(|(a, b)| format!("v{a}.{b}")),
        1 => (0u64..3, prop::sample::select(vec!["alpha", "beta.1", "rc.2"]))
            .prop_map(|(a, pre)| format!("v{a}.0.0-{pre}")),
        1 => "[a-z]{1,6}",
    ]
}

proptest! {
    #[test]
    fn comparison_is_antisymmetric(a in tag(), b in tag()) {
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn comparison_is_transitive(a in tag(), b in tag(), c in tag()) {
        if compare(&a, &b) != Ordering::Greater && compare(&b, &c) != Ordering::Greater {
            prop_assert_ne!(compare(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn a_version_is_never_newer_than_itself(a in tag()) {
        prop_assert!(!is_newer(&a, &a));
    }
}

#[test]
fn prefix_and_shorthand_do_not_matter() {
    assert_eq!(compare("v1.2.0", "1.2.0"), Ordering::Equal);
    assert_eq!(compare("V1.2", "v1.2.0"), Ordering::Equal);
    assert!(is_newer("v1.2.8", "v1.3.0"));
    assert!(is_newer("v1.2.8", "v1.10.0"));
    assert!(!is_newer("v1.3.0", "v1.2.8"));
}

#[test]
fn prerelease_sorts_below_release() {
    assert!(is_newer("v2.0.0-rc.1", "v2.0.0"));
    assert!(!is_newer("v2.0.0", "v2.0.0-rc.1"));
}

#[test]
fn garbage_tags_never_trigger_updates() {
    assert!(!is_newer("v1.2.8", "nightly"));
    assert!(is_newer("nightly", "v0.0.1"));
    assert_eq!(compare("nightly", "garbage"), Ordering::Equal);
}
