#![forbid(unsafe_code)]

//! Property tests over generated states, paths, arrays, and action sequences.

use proptest::prelude::*;
use serde_json::{Value, json};
use storelink_core::{StatePath, apply_splices, calculate_splices, resolve};
use storelink_harness::{MockElement, TestStore, fixtures, strategies};
use storelink_runtime::{Action, Connector, Store};

// ============================================================================
// Paths
// ============================================================================

proptest! {
    #[test]
    fn resolve_is_total(state in strategies::state(), path in strategies::path()) {
        // Never panics; a hit is always reachable segment by segment.
        if let Some(found) = resolve(&state, path.as_str()) {
            let parsed = StatePath::parse(&path);
            let mut cursor = &state;
            for segment in parsed.segments() {
                cursor = match cursor {
                    Value::Object(map) => &map[segment.as_str()],
                    Value::Array(items) => &items[segment.parse::<usize>().unwrap()],
                    other => panic!("descended into {other}"),
                };
            }
            prop_assert_eq!(cursor, found);
        }
    }

    #[test]
    fn empty_path_is_whole_state(state in strategies::state()) {
        prop_assert_eq!(resolve(&state, ""), Some(&state));
    }
}

// ============================================================================
// Splices
// ============================================================================

proptest! {
    #[test]
    fn splices_transform_previous_into_next(
        previous in strategies::int_array(),
        next in strategies::int_array(),
    ) {
        let splices = calculate_splices(&previous, &next);
        prop_assert_eq!(apply_splices(&previous, &splices), next.clone());
        if previous == next {
            prop_assert!(splices.is_empty());
        }
    }

    #[test]
    fn bound_array_follows_store(steps in prop::collection::vec(strategies::int_array(), 1..6)) {
        let store = TestStore::fixed(json!({ "todos": [] }));
        let connector = Connector::new(store.clone()).unwrap();
        let el = connector
            .augment(fixtures::todo_definition())
            .instantiate(MockElement::new("todo-list"));
        el.attach();

        for step in steps {
            store.replace_state(json!({ "todos": step.clone() }));
            let element = el.element();
            let element = element.borrow();
            prop_assert_eq!(element.get("items"), Some(&Value::Array(step)));
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

proptest! {
    #[test]
    fn counter_stays_in_sync(actions in strategies::counter_actions()) {
        let store = fixtures::counter_store(0);
        let connector = Connector::new(store.clone()).unwrap();
        let el = connector
            .augment(fixtures::counter_definition())
            .instantiate(MockElement::new("x-counter"));
        el.attach();

        for action in &actions {
            store.dispatch(Action::Plain(action.clone())).unwrap();
            let element = el.element();
            let element = element.borrow();
            let state = store.get_state();
            prop_assert_eq!(element.get("count"), Some(&state["count"]));
        }
        prop_assert_eq!(el.element().borrow().emitted("state-changed").len(), actions.len());
    }

    #[test]
    fn attach_detach_sequences(ops in prop::collection::vec(any::<bool>(), 0..16)) {
        let store = fixtures::counter_store(0);
        let connector = Connector::new(store.clone()).unwrap();
        let el = connector
            .augment(fixtures::counter_definition())
            .instantiate(MockElement::new("x-counter"));

        let mut attached = false;
        for attach in ops {
            if attach {
                let outcome = el.attach();
                prop_assert_eq!(outcome.is_new(), !attached);
            } else {
                prop_assert_eq!(el.detach(), attached);
            }
            attached = attach;
            prop_assert_eq!(el.is_attached(), attached);
            prop_assert_eq!(store.listener_count(), usize::from(attached));
            prop_assert_eq!(connector.bound_count(), usize::from(attached));
        }
    }
}
