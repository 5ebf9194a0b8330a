#![forbid(unsafe_code)]

use serde_json::json;
use storelink::prelude::*;
use storelink_harness::{MockElement, fixtures};

#[test]
fn connect_and_dispatch_through_prelude() {
    let store = fixtures::counter_store(0);
    let connector = storelink::connect(store.clone()).unwrap();
    let el = connector
        .augment(fixtures::counter_definition())
        .instantiate(MockElement::new("x-counter"));
    el.attach();
    el.dispatch_named("set", vec![json!(5)]).unwrap();
    assert_eq!(el.element().borrow().get("count"), Some(&json!(5)));
    assert_eq!(store.get_state(), json!({ "count": 5 }));
}

#[test]
fn connect_with_rejects_bad_policy() {
    let store = fixtures::counter_store(0);
    let err = storelink::connect_with(store, ConnectConfig::new().state_changed_event(""))
        .err();
    assert!(matches!(err, Some(ConfigError::InvalidPolicy(_))));
}

#[test]
fn resolve_is_reexported() {
    let state = json!({ "a": [10, 20] });
    assert_eq!(storelink::resolve(&state, "a.1"), Some(&json!(20)));
    assert_eq!(
        StatePath::from_segments(["a", "1"]),
        StatePath::parse("a.1")
    );
}
