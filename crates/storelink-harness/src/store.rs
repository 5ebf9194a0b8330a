#![forbid(unsafe_code)]

//! A reducer store for tests.
//!
//! [`TestStore`] behaves like a minimal Redux store: a pure reducer computes
//! the next state from each plain action, and every listener subscribed when
//! a dispatch starts is notified after the state has been replaced, even if
//! it unsubscribes in the middle of the round. Thunks are run by built-in
//! middleware unless the store is created without it.
//!
//! The store also records what reached it so tests can assert on the exact
//! actions the engine produced.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use storelink_core::{Error, Result};
use storelink_runtime::{
    Action, DispatchRequest, Dispatcher, GetStateFn, Listener, Store, Thunk, ThunkArgs,
    Unsubscribe,
};

/// Computes the next state from the current state and a plain action.
pub type Reducer = Box<dyn Fn(&Value, &Value) -> Value>;

/// Reducer store with thunk middleware and action recording.
pub struct TestStore {
    this: Weak<TestStore>,
    state: RefCell<Value>,
    reducer: Reducer,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
    reduced: RefCell<Vec<Value>>,
    received: RefCell<Vec<Action>>,
    thunks_run: Cell<usize>,
    thunk_middleware: bool,
}

impl TestStore {
    /// A store with thunk middleware.
    pub fn new(initial: Value, reducer: impl Fn(&Value, &Value) -> Value + 'static) -> Rc<Self> {
        Self::build(initial, Box::new(reducer), true)
    }

    /// A store that rejects thunks.
    pub fn without_middleware(
        initial: Value,
        reducer: impl Fn(&Value, &Value) -> Value + 'static,
    ) -> Rc<Self> {
        Self::build(initial, Box::new(reducer), false)
    }

    /// A store whose reducer ignores every action.
    pub fn fixed(initial: Value) -> Rc<Self> {
        Self::new(initial, |state, _| state.clone())
    }

    fn build(initial: Value, reducer: Reducer, thunk_middleware: bool) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            state: RefCell::new(initial),
            reducer,
            listeners: RefCell::default(),
            next_listener: Cell::new(0),
            reduced: RefCell::default(),
            received: RefCell::default(),
            thunks_run: Cell::new(0),
            thunk_middleware,
        })
    }

    /// Plain actions that reached the reducer, in order.
    #[must_use]
    pub fn reduced(&self) -> Vec<Value> {
        self.reduced.borrow().clone()
    }

    /// Every action handed to [`Store::dispatch`], in order.
    #[must_use]
    pub fn received(&self) -> Vec<Action> {
        self.received.borrow().clone()
    }

    /// Thunks received by [`Store::dispatch`], in order.
    #[must_use]
    pub fn received_thunks(&self) -> Vec<Thunk> {
        self.received
            .borrow()
            .iter()
            .filter_map(|action| match action {
                Action::Thunk(thunk) => Some(thunk.clone()),
                Action::Plain(_) => None,
            })
            .collect()
    }

    /// Number of thunks the middleware has run.
    #[must_use]
    pub fn thunks_run(&self) -> usize {
        self.thunks_run.get()
    }

    /// Live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Replace the state without a reducer and notify listeners.
    pub fn replace_state(&self, state: Value) {
        *self.state.borrow_mut() = state;
        self.notify();
    }

    /// Notify listeners without changing the state.
    pub fn notify(&self) {
        let round: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in round {
            listener();
        }
    }

    /// The dispatcher middleware hands to thunks.
    ///
    /// It understands plain actions and thunks; action creator names are
    /// rejected because the store knows nothing about components.
    #[must_use]
    pub fn raw_dispatcher(&self) -> Dispatcher {
        let this = self.this.clone();
        Dispatcher::new(move |request| {
            let Some(store) = this.upgrade() else {
                return Err(Error::Rejected {
                    reason: "store dropped".into(),
                });
            };
            match request {
                DispatchRequest::Plain(value) => store.dispatch(Action::Plain(value)),
                DispatchRequest::Thunk(thunk) => store.dispatch(Action::Thunk(thunk)),
                DispatchRequest::ByName { name, .. } => Err(Error::Rejected {
                    reason: format!("store cannot resolve action creator \"{name}\""),
                }),
            }
        })
    }

    fn get_state_fn(&self) -> GetStateFn {
        let this = self.this.clone();
        GetStateFn(Rc::new(move || {
            this.upgrade()
                .map_or(Value::Null, |store| store.state.borrow().clone())
        }))
    }

    fn reduce(&self, action: Value) -> Value {
        let next = (self.reducer)(&self.state.borrow(), &action);
        *self.state.borrow_mut() = next;
        self.reduced.borrow_mut().push(action.clone());
        tracing::trace!(target: "storelink::harness", action = %action, "reduced");
        self.notify();
        action
    }
}

impl Store for TestStore {
    fn get_state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn dispatch(&self, action: Action) -> Result<Value> {
        self.received.borrow_mut().push(action.clone());
        match action {
            Action::Plain(value) => Ok(self.reduce(value)),
            Action::Thunk(thunk) if self.thunk_middleware => {
                self.thunks_run.set(self.thunks_run.get() + 1);
                thunk.invoke(ThunkArgs {
                    dispatch: self.raw_dispatcher(),
                    get_state: self.get_state_fn(),
                    extra: Vec::new(),
                })
            }
            Action::Thunk(_) => Err(Error::Rejected {
                reason: "thunk dispatched without thunk middleware".into(),
            }),
        }
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let key = self.next_listener.get();
        self.next_listener.set(key + 1);
        self.listeners.borrow_mut().push((key, listener));
        let this = self.this.clone();
        Unsubscribe::new(move || {
            if let Some(store) = this.upgrade() {
                store.listeners.borrow_mut().retain(|(k, _)| *k != key);
            }
        })
    }
}

impl fmt::Debug for TestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStore")
            .field("state", &self.state.borrow())
            .field("listeners", &self.listener_count())
            .field("thunk_middleware", &self.thunk_middleware)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter() -> Rc<TestStore> {
        TestStore::new(json!({ "count": 0 }), |state, action| {
            let count = state["count"].as_i64().unwrap_or(0);
            match action["type"].as_str() {
                Some("INC") => json!({ "count": count + 1 }),
                _ => state.clone(),
            }
        })
    }

    #[test]
    fn reducer_runs_before_listeners() {
        let store = counter();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let reader = Rc::clone(&store);
        let mut handle = store.subscribe(Rc::new(move || {
            log.borrow_mut().push(reader.get_state()["count"].clone());
        }));

        store.dispatch(Action::Plain(json!({ "type": "INC" }))).unwrap();
        assert_eq!(*seen.borrow(), vec![json!(1)]);

        handle.call();
        store.dispatch(Action::Plain(json!({ "type": "INC" }))).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn middleware_runs_thunks() {
        let store = counter();
        let thunk = Thunk::new(|args| {
            args.dispatch.dispatch(json!({ "type": "INC" }))?;
            args.dispatch.dispatch(json!({ "type": "INC" }))?;
            Ok(args.get_state.call())
        });
        let out = store.dispatch(Action::Thunk(thunk)).unwrap();
        assert_eq!(out, json!({ "count": 2 }));
        assert_eq!(store.thunks_run(), 1);
        assert_eq!(store.reduced().len(), 2);
        assert_eq!(store.received().len(), 3);
    }

    #[test]
    fn raw_dispatcher_rejects_names() {
        let store = counter();
        let err = store.raw_dispatcher().dispatch("increment").unwrap_err();
        assert!(err.to_string().contains("\"increment\""));
    }

    #[test]
    fn thunks_rejected_without_middleware() {
        let store = TestStore::without_middleware(json!({}), |s, _| s.clone());
        let result = store.dispatch(Action::Thunk(Thunk::new(|_| Ok(Value::Null))));
        assert!(matches!(result, Err(Error::Rejected { .. })));
    }

    #[test]
    fn unsubscribe_mid_round_still_delivers_round() {
        let store = TestStore::fixed(json!({}));
        let hits = Rc::new(Cell::new(0));
        let second_handle: Rc<RefCell<Option<Unsubscribe>>> = Rc::default();

        let slot = Rc::clone(&second_handle);
        let mut first = store.subscribe(Rc::new(move || {
            if let Some(mut handle) = slot.borrow_mut().take() {
                handle.call();
            }
        }));
        let counter = Rc::clone(&hits);
        *second_handle.borrow_mut() = Some(store.subscribe(Rc::new(move || {
            counter.set(counter.get() + 1);
        })));

        store.notify();
        assert_eq!(hits.get(), 1);
        store.notify();
        assert_eq!(hits.get(), 1);
        first.call();
    }
}
