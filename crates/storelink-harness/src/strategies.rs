#![forbid(unsafe_code)]

//! `proptest` strategies for states, paths, and array values.

use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Short object keys, drawn from a small alphabet so paths hit often.
pub fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a".to_owned()),
        Just("b".to_owned()),
        Just("todos".to_owned()),
        Just("count".to_owned()),
        "[a-z]{1,4}",
    ]
}

/// JSON scalars.
pub fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ]
}

/// Arbitrary nested state snapshots.
pub fn state() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((key(), inner), 0..6).prop_map(|entries| {
                Value::Object(entries.into_iter().collect::<Map<String, Value>>())
            }),
        ]
    })
}

/// Dotted paths mixing keys and array indices, possibly with empty segments.
pub fn path() -> impl Strategy<Value = String> {
    let segment = prop_oneof![key(), (0usize..4).prop_map(|i| i.to_string()), Just(String::new())];
    prop::collection::vec(segment, 0..5).prop_map(|segments| segments.join("."))
}

/// Small arrays of small integers, so consecutive draws share elements.
pub fn int_array() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec((0i64..6).prop_map(|n| json!(n)), 0..10)
}

/// A sequence of counter actions.
pub fn counter_actions() -> impl Strategy<Value = Vec<Value>> {
    let action = prop_oneof![
        Just(json!({ "type": "INCREMENT" })),
        Just(json!({ "type": "DECREMENT" })),
        (-50i64..50).prop_map(|value| json!({ "type": "SET", "value": value })),
    ];
    prop::collection::vec(action, 0..12)
}
