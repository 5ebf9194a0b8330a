#![forbid(unsafe_code)]

//! Reference stores and component definitions.
//!
//! Two small applications used throughout the test suites:
//!
//! | Fixture | State | Actions |
//! |---------|-------|---------|
//! | Counter | `{ "count": n }` | `INCREMENT`, `DECREMENT`, `SET { value }` |
//! | Todos | `{ "todos": [..], "filter": "all" }` | `ADD_TODO { text }`, `REMOVE_TODO { index }`, `TOGGLE_TODO { index }`, `SET_FILTER { filter }` |

use std::rc::Rc;

use serde_json::{Value, json};
use storelink_runtime::{
    Action, ComponentDefinition, PropertyDescriptor, PropertyKind, Thunk,
};

use crate::store::TestStore;

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// Reducer for the counter application.
#[must_use]
pub fn counter_reducer(state: &Value, action: &Value) -> Value {
    let count = state["count"].as_i64().unwrap_or(0);
    match action["type"].as_str() {
        Some("INCREMENT") => json!({ "count": count + 1 }),
        Some("DECREMENT") => json!({ "count": count - 1 }),
        Some("SET") => json!({ "count": action["value"].as_i64().unwrap_or(count) }),
        _ => state.clone(),
    }
}

/// Counter store starting at `count`.
#[must_use]
pub fn counter_store(count: i64) -> Rc<TestStore> {
    TestStore::new(json!({ "count": count }), counter_reducer)
}

/// `<x-counter>` with `count` bound to `"count"` and three action creators:
/// `increment`, `set(value)`, and `increment_twice`, which returns a thunk.
#[must_use]
pub fn counter_definition() -> ComponentDefinition {
    ComponentDefinition::new("x-counter")
        .property("count", PropertyDescriptor::bound("count").kind(PropertyKind::Number))
        .action("increment", |_, _| {
            Action::Plain(json!({ "type": "INCREMENT" }))
        })
        .action("set", |_, args| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            Action::Plain(json!({ "type": "SET", "value": value }))
        })
        .action("increment_twice", |_, _| {
            Action::Thunk(Thunk::new(|args| {
                args.dispatch.dispatch("increment")?;
                args.dispatch.dispatch("increment")
            }))
        })
}

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

/// Reducer for the todo application.
#[must_use]
pub fn todo_reducer(state: &Value, action: &Value) -> Value {
    let mut next = state.clone();
    let index = action["index"].as_u64().and_then(|i| usize::try_from(i).ok());
    match action["type"].as_str() {
        Some("ADD_TODO") => {
            if let Some(todos) = next["todos"].as_array_mut() {
                todos.push(json!({ "text": action["text"].clone(), "done": false }));
            }
        }
        Some("REMOVE_TODO") => {
            if let (Some(todos), Some(index)) = (next["todos"].as_array_mut(), index) {
                if index < todos.len() {
                    todos.remove(index);
                }
            }
        }
        Some("TOGGLE_TODO") => {
            if let Some(done) = index.and_then(|i| next["todos"].get_mut(i)).map(|t| &mut t["done"]) {
                *done = Value::Bool(!done.as_bool().unwrap_or(false));
            }
        }
        Some("SET_FILTER") => {
            next["filter"] = action["filter"].clone();
        }
        _ => {}
    }
    next
}

/// Empty todo store.
#[must_use]
pub fn todo_store() -> Rc<TestStore> {
    TestStore::new(json!({ "todos": [], "filter": "all" }), todo_reducer)
}

/// `<todo-list>`: `items` is an array bound to `"todos"`, `filter` is a
/// read-only binding, and `remaining` is computed from the state.
#[must_use]
pub fn todo_definition() -> ComponentDefinition {
    ComponentDefinition::new("todo-list")
        .property(
            "items",
            PropertyDescriptor::bound("todos").kind(PropertyKind::Array),
        )
        .property(
            "filter",
            PropertyDescriptor::bound("filter")
                .kind(PropertyKind::String)
                .read_only(true),
        )
        .property(
            "remaining",
            PropertyDescriptor::computed(|state, _| {
                let open = state["todos"]
                    .as_array()
                    .map_or(0, |todos| todos.iter().filter(|t| t["done"] != json!(true)).count());
                json!(open)
            })
            .kind(PropertyKind::Number),
        )
        .action("add", |_, args| {
            let text = args.first().cloned().unwrap_or(Value::Null);
            Action::Plain(json!({ "type": "ADD_TODO", "text": text }))
        })
        .action("remove", |_, args| {
            let index = args.first().cloned().unwrap_or(Value::Null);
            Action::Plain(json!({ "type": "REMOVE_TODO", "index": index }))
        })
        .action("toggle", |_, args| {
            let index = args.first().cloned().unwrap_or(Value::Null);
            Action::Plain(json!({ "type": "TOGGLE_TODO", "index": index }))
        })
}
