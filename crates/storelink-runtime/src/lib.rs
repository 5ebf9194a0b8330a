#![forbid(unsafe_code)]

//! Store subscriptions, property bindings, and action dispatch.
//!
//! The runtime wires host elements to an external state store:
//!
//! - [`store`]: the store contract, capability checks, and a closure adapter.
//! - [`element`]: the host element contract and element events.
//! - [`action`]: actions, thunks, and dispatch requests.
//! - [`descriptor`]: property and action declarations, component definitions.
//! - [`binding`]: computing and applying store-derived property values.
//! - [`registry`]: per-element subscription lifecycle.
//! - [`dispatch`]: resolving dispatch requests into store actions.
//! - [`config`]: connector policy, optionally loaded from TOML or JSON.
//! - [`connect`]: the connector, connected component types, and instances.
//!
//! Everything is single-threaded and `Rc`/`RefCell` based. Store
//! notifications are processed synchronously in the order the store
//! delivers them.

pub mod action;
pub mod binding;
pub mod config;
pub mod connect;
pub mod descriptor;
pub mod dispatch;
pub mod element;
pub mod registry;
pub mod store;

#[cfg(test)]
mod test_support;

pub use action::{Action, DispatchRequest, Dispatcher, GetState, GetStateFn, Thunk, ThunkArgs};
pub use binding::{ApplyReport, Binding};
pub use config::{ConnectConfig, DEFAULT_STATE_CHANGED_EVENT, DoubleBindingPolicy};
pub use connect::{Connected, ConnectedComponent, Connector};
pub use descriptor::{
    ActionCreator, ActionCreatorSet, ActionDecl, ComponentDefinition, ComputeFn, CreatorContext,
    EventHandler, EventMap, Layer, MapDispatchFn, MapStateFn, PropertyDescriptor,
    PropertyDescriptorSet, PropertyKind, StateSource,
};
pub use dispatch::Resolver;
pub use element::{Element, ElementEvent, ElementId, EventListener, ListenerId};
pub use registry::{
    BindOptions, BindOutcome, MAX_RESYNC_PASSES, SubscriptionId, SubscriptionRegistry,
};
pub use store::{Capabilities, Listener, Store, StoreAdapter, Unsubscribe, validate};
