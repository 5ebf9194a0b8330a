#![forbid(unsafe_code)]

//! Bind component properties to a shared application-state store.
//!
//! Components declare which properties come from the store (by state path or
//! computed from the state) and which named action creators they offer. A
//! [`Connector`] subscribes each attached element to the store, keeps its
//! properties in sync, and routes dispatches through the component's action
//! creators.
//!
//! This crate re-exports:
//! - [`storelink_core`]: paths, declaration layers, splices, diagnostics, and errors
//! - [`storelink_runtime`]: stores, elements, descriptors, bindings, and the connector
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use serde_json::{Value, json};
//! use storelink::prelude::*;
//!
//! #[derive(Default)]
//! struct Label {
//!     props: serde_json::Map<String, Value>,
//! }
//!
//! impl Element for Label {
//!     fn tag(&self) -> &str {
//!         "x-label"
//!     }
//!     fn property(&self, name: &str) -> Option<Value> {
//!         self.props.get(name).cloned()
//!     }
//!     fn set_property(&mut self, name: &str, value: Value) {
//!         self.props.insert(name.to_owned(), value);
//!     }
//!     fn set_read_only_property(&mut self, name: &str, value: Value) {
//!         self.props.insert(name.to_owned(), value);
//!     }
//!     fn emit(&mut self, _event: &ElementEvent) {}
//!     fn add_listener(&mut self, _event: &str, _listener: EventListener) -> ListenerId {
//!         ListenerId(0)
//!     }
//!     fn remove_listener(&mut self, _event: &str, _id: ListenerId) {}
//! }
//!
//! let state = Rc::new(RefCell::new(json!({ "user": { "name": "Ada" } })));
//! let reader = Rc::clone(&state);
//! let store = StoreAdapter::new()
//!     .with_get_state(move || reader.borrow().clone())
//!     .with_dispatch(|action| Ok(action.as_plain().cloned().unwrap_or(Value::Null)))
//!     .with_subscribe(|_| Unsubscribe::noop());
//!
//! let connector = storelink::connect(Rc::new(store)).unwrap();
//! let label = connector
//!     .augment(
//!         ComponentDefinition::new("x-label")
//!             .property("text", PropertyDescriptor::bound("user.name")),
//!     )
//!     .instantiate(Label::default());
//!
//! label.attach();
//! assert_eq!(label.element().borrow().property("text"), Some(json!("Ada")));
//! ```

use std::rc::Rc;

pub use storelink_core;
pub use storelink_runtime;

pub use storelink_core::{
    ConfigError, Diagnostic, DiagnosticSink, Error, Result, Splice, StatePath, resolve,
};
pub use storelink_runtime::{
    Action, ComponentDefinition, ConnectConfig, Connected, ConnectedComponent, Connector,
    DoubleBindingPolicy, Element, PropertyDescriptor, Store, Thunk,
};

/// Create a [`Connector`] for `store`.
///
/// Fails with [`ConfigError::MissingCapability`] when the store does not
/// provide every operation the engine needs.
pub fn connect(store: Rc<dyn Store>) -> std::result::Result<Connector, ConfigError> {
    Connector::new(store)
}

/// Create a [`Connector`] with an explicit policy.
pub fn connect_with(
    store: Rc<dyn Store>,
    config: ConnectConfig,
) -> std::result::Result<Connector, ConfigError> {
    Connector::new(store)?.with_config(config)
}

/// Everything a component author usually needs.
pub mod prelude {
    pub use storelink_core::{
        CollectingSink, ConfigError, Diagnostic, DiagnosticSink, Error, Splice, StatePath,
        TracingSink,
    };
    pub use storelink_runtime::{
        Action, ActionDecl, ComponentDefinition, ConnectConfig, Connected, ConnectedComponent,
        Connector, CreatorContext, DispatchRequest, Dispatcher, DoubleBindingPolicy, Element,
        ElementEvent, EventListener, EventMap, Layer, ListenerId, PropertyDescriptor,
        PropertyKind, Store, StoreAdapter, Thunk, ThunkArgs, Unsubscribe,
    };
}
