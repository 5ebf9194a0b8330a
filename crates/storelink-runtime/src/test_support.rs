#![forbid(unsafe_code)]

//! Small store and element doubles shared by this crate's unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value};
use storelink_core::{Result, Splice};

use crate::action::Action;
use crate::element::{Element, ElementEvent, EventListener, ListenerId};
use crate::store::{Listener, Store, Unsubscribe};

type Listeners = Rc<RefCell<Vec<(u64, Listener)>>>;

/// A store whose state is replaced wholesale by [`Bus::set`].
///
/// `dispatch` records plain actions; an object action with a `"set"` key
/// replaces the state with that value and notifies.
pub struct Bus {
    pub state: RefCell<Value>,
    pub dispatched: RefCell<Vec<Value>>,
    listeners: Listeners,
    next: Cell<u64>,
}

impl Bus {
    pub fn new(state: Value) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(state),
            dispatched: RefCell::default(),
            listeners: Rc::default(),
            next: Cell::new(0),
        })
    }

    pub fn set(&self, state: Value) {
        *self.state.borrow_mut() = state;
        for listener in self.leak_listeners() {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Clones of the currently registered listeners.
    pub fn leak_listeners(&self) -> Vec<Listener> {
        self.listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect()
    }
}

impl Store for Bus {
    fn get_state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn dispatch(&self, action: Action) -> Result<Value> {
        let value = action.as_plain().cloned().unwrap_or(Value::Null);
        self.dispatched.borrow_mut().push(value.clone());
        if let Some(next) = value.get("set") {
            self.set(next.clone());
        }
        Ok(value)
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let key = self.next.get();
        self.next.set(key + 1);
        self.listeners.borrow_mut().push((key, listener));
        let listeners = Rc::downgrade(&self.listeners);
        Unsubscribe::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().retain(|(k, _)| *k != key);
            }
        })
    }
}

/// An element that stores properties in a map and records what happens.
#[derive(Default)]
pub struct Node {
    pub props: Map<String, Value>,
    pub events: Vec<String>,
    pub splices: Vec<(String, Vec<Splice>)>,
    listeners: Vec<(String, ListenerId, EventListener)>,
    next: u64,
}

impl Node {
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Deliver `event` to the node's listeners without holding its borrow.
pub fn fire(node: &Rc<RefCell<Node>>, name: &str, detail: Value) -> ElementEvent {
    let listeners: Vec<EventListener> = node
        .borrow()
        .listeners
        .iter()
        .filter(|(event, _, _)| event == name)
        .map(|(_, _, l)| Rc::clone(l))
        .collect();
    let event = ElementEvent::new(name, detail);
    for listener in listeners {
        if event.is_propagation_stopped() {
            break;
        }
        listener(&event);
    }
    event
}

impl Element for Node {
    fn tag(&self) -> &str {
        "x-node"
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.props.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: Value) {
        self.props.insert(name.to_owned(), value);
    }

    fn set_read_only_property(&mut self, name: &str, value: Value) {
        self.props.insert(name.to_owned(), value);
    }

    fn notify_splices(&mut self, name: &str, splices: &[Splice]) {
        self.splices.push((name.to_owned(), splices.to_vec()));
    }

    fn emit(&mut self, event: &ElementEvent) {
        self.events.push(event.name().to_owned());
    }

    fn add_listener(&mut self, event: &str, listener: EventListener) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.listeners.push((event.to_owned(), id, listener));
        id
    }

    fn remove_listener(&mut self, event: &str, id: ListenerId) {
        self.listeners
            .retain(|(e, l, _)| !(e == event && *l == id));
    }
}
