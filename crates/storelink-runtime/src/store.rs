#![forbid(unsafe_code)]

//! The store contract.
//!
//! storelink never owns application state. It talks to an external store
//! through three operations: read the current snapshot, dispatch an action,
//! and subscribe to change notifications.
//!
//! Stores built from optional closures ([`StoreAdapter`]) report which of
//! those operations they actually provide through [`Capabilities`], and
//! [`validate`] rejects a store missing any of them before anything binds.
//!
//! # Invariants
//!
//! 1. An [`Unsubscribe`] handle runs its teardown at most once.
//! 2. After an [`Unsubscribe`] has run, the store never calls that listener
//!    again for notifications that start afterwards.
//!
//! # Failure Modes
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Adapter without `get_state` | `validate` fails with `MissingCapability { "getState" }` |
//! | Adapter without `dispatch` | `validate` fails with `MissingCapability { "dispatch" }` |
//! | Adapter without `subscribe` | `validate` fails with `MissingCapability { "subscribe" }` |

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use serde_json::Value;
use storelink_core::{ConfigError, Error, Result};

use crate::action::Action;

bitflags! {
    /// Operations a store provides.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `get_state` returns real snapshots.
        const GET_STATE = 0b001;
        /// `dispatch` forwards actions.
        const DISPATCH = 0b010;
        /// `subscribe` delivers notifications.
        const SUBSCRIBE = 0b100;
    }
}

/// Change-notification callback registered with a store.
pub type Listener = Rc<dyn Fn()>;

/// Handle returned by [`Store::subscribe`].
///
/// Calling [`Unsubscribe::call`] detaches the listener. Dropping the handle
/// without calling it leaves the listener subscribed.
#[must_use = "dropping an Unsubscribe handle leaves the listener subscribed"]
pub struct Unsubscribe(Option<Box<dyn FnOnce()>>);

impl Unsubscribe {
    /// Wrap a teardown closure.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A handle with nothing to tear down.
    pub fn noop() -> Self {
        Self(None)
    }

    /// Run the teardown. Subsequent calls do nothing.
    pub fn call(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    /// Whether the teardown has not run yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// An external application-state store.
pub trait Store {
    /// The current state snapshot.
    fn get_state(&self) -> Value;

    /// Send one action to the store.
    fn dispatch(&self, action: Action) -> Result<Value>;

    /// Register a change listener.
    fn subscribe(&self, listener: Listener) -> Unsubscribe;

    /// Operations this store actually provides.
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }
}

impl<S: Store + ?Sized> Store for Rc<S> {
    fn get_state(&self) -> Value {
        (**self).get_state()
    }

    fn dispatch(&self, action: Action) -> Result<Value> {
        (**self).dispatch(action)
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        (**self).subscribe(listener)
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }
}

/// Check that `store` provides every operation the engine relies on.
pub fn validate(store: &dyn Store) -> std::result::Result<(), ConfigError> {
    let caps = store.capabilities();
    let required = [
        (Capabilities::GET_STATE, "getState"),
        (Capabilities::DISPATCH, "dispatch"),
        (Capabilities::SUBSCRIBE, "subscribe"),
    ];
    for (flag, capability) in required {
        if !caps.contains(flag) {
            return Err(ConfigError::MissingCapability { capability });
        }
    }
    Ok(())
}

type GetStateOp = Rc<dyn Fn() -> Value>;
type DispatchOp = Rc<dyn Fn(Action) -> Result<Value>>;
type SubscribeOp = Rc<dyn Fn(Listener) -> Unsubscribe>;

/// A [`Store`] assembled from individual closures.
///
/// Each operation is optional; [`capabilities`](Store::capabilities) reports
/// only the ones supplied. Calling a missing operation returns `null`, a
/// [`Error::Rejected`], or a no-op handle respectively.
#[derive(Clone, Default)]
pub struct StoreAdapter {
    get_state: Option<GetStateOp>,
    dispatch: Option<DispatchOp>,
    subscribe: Option<SubscribeOp>,
}

impl StoreAdapter {
    /// An adapter with no operations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply the `get_state` operation.
    #[must_use]
    pub fn with_get_state(mut self, f: impl Fn() -> Value + 'static) -> Self {
        self.get_state = Some(Rc::new(f));
        self
    }

    /// Supply the `dispatch` operation.
    #[must_use]
    pub fn with_dispatch(mut self, f: impl Fn(Action) -> Result<Value> + 'static) -> Self {
        self.dispatch = Some(Rc::new(f));
        self
    }

    /// Supply the `subscribe` operation.
    #[must_use]
    pub fn with_subscribe(mut self, f: impl Fn(Listener) -> Unsubscribe + 'static) -> Self {
        self.subscribe = Some(Rc::new(f));
        self
    }
}

impl Store for StoreAdapter {
    fn get_state(&self) -> Value {
        self.get_state.as_ref().map_or(Value::Null, |f| f())
    }

    fn dispatch(&self, action: Action) -> Result<Value> {
        match &self.dispatch {
            Some(f) => f(action),
            None => Err(Error::Rejected {
                reason: "store has no dispatch".into(),
            }),
        }
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        match &self.subscribe {
            Some(f) => f(listener),
            None => Unsubscribe::noop(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::GET_STATE, self.get_state.is_some());
        caps.set(Capabilities::DISPATCH, self.dispatch.is_some());
        caps.set(Capabilities::SUBSCRIBE, self.subscribe.is_some());
        caps
    }
}

impl fmt::Debug for StoreAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAdapter")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn empty_adapter_has_no_capabilities() {
        let adapter = StoreAdapter::new();
        assert!(adapter.capabilities().is_empty());
        assert_eq!(
            validate(&adapter),
            Err(ConfigError::MissingCapability {
                capability: "getState"
            })
        );
        assert_eq!(adapter.get_state(), Value::Null);
        assert!(matches!(
            adapter.dispatch(Action::Plain(json!({}))),
            Err(Error::Rejected { .. })
        ));
    }

    #[test]
    fn validation_names_first_missing_operation() {
        let adapter = StoreAdapter::new()
            .with_get_state(|| json!({}))
            .with_dispatch(|_| Ok(Value::Null));
        assert_eq!(
            validate(&adapter),
            Err(ConfigError::MissingCapability {
                capability: "subscribe"
            })
        );

        let complete = adapter.with_subscribe(|_| Unsubscribe::noop());
        assert_eq!(complete.capabilities(), Capabilities::all());
        assert!(validate(&complete).is_ok());
    }

    #[test]
    fn unsubscribe_runs_once() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let mut handle = Unsubscribe::new(move || counter.set(counter.get() + 1));
        assert!(handle.is_pending());
        handle.call();
        handle.call();
        assert_eq!(runs.get(), 1);
        assert!(!handle.is_pending());
    }

    #[test]
    fn rc_store_forwards() {
        let adapter = Rc::new(StoreAdapter::new().with_get_state(|| json!({ "n": 1 })));
        assert_eq!(Store::get_state(&adapter), json!({ "n": 1 }));
        assert_eq!(Store::capabilities(&adapter), Capabilities::GET_STATE);
    }
}
