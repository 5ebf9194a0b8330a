#![forbid(unsafe_code)]

//! A recording host element.
//!
//! [`MockElement`] keeps its properties in a JSON map and appends every
//! operation the engine performs on it to an [`ElementOp`] log. Events it
//! emits are recorded and delivered to its own listeners, the way a DOM
//! element's `dispatchEvent` reaches listeners registered on it.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use storelink_core::Splice;
use storelink_runtime::{Element, ElementEvent, EventListener, ListenerId};

/// One operation performed on a [`MockElement`].
#[derive(Clone, Debug, PartialEq)]
pub enum ElementOp {
    Set { name: String, value: Value },
    SetReadOnly { name: String, value: Value },
    Splices { name: String, splices: Vec<Splice> },
    PropertiesChanged(Vec<String>),
    Emit { name: String, detail: Value },
    AddListener { event: String },
    RemoveListener { event: String },
}

/// Recording element.
pub struct MockElement {
    tag: String,
    props: Map<String, Value>,
    ops: Vec<ElementOp>,
    listeners: Vec<(String, ListenerId, EventListener)>,
    next_listener: u64,
}

impl MockElement {
    /// An element with no properties or listeners.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: Map::new(),
            ops: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Preset a property without recording an operation.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.props.insert(name.into(), value);
        self
    }

    /// Current value of a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// All recorded operations, oldest first.
    #[must_use]
    pub fn ops(&self) -> &[ElementOp] {
        &self.ops
    }

    /// Forget recorded operations.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Names assigned through either setter, in order.
    #[must_use]
    pub fn assigned(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ElementOp::Set { name, .. } | ElementOp::SetReadOnly { name, .. } => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Names assigned through the read-only setter, in order.
    #[must_use]
    pub fn read_only_assigned(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ElementOp::SetReadOnly { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Splice batches announced for `name`.
    #[must_use]
    pub fn splices_for(&self, name: &str) -> Vec<Vec<Splice>> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ElementOp::Splices { name: n, splices } if n == name => Some(splices.clone()),
                _ => None,
            })
            .collect()
    }

    /// Details of every emitted event called `name`.
    #[must_use]
    pub fn emitted(&self, name: &str) -> Vec<Value> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ElementOp::Emit { name: n, detail } if n == name => Some(detail.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `properties_changed` notifications.
    #[must_use]
    pub fn change_notifications(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, ElementOp::PropertiesChanged(_)))
            .count()
    }

    /// Listeners currently added, across all events.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners currently added for `event`.
    #[must_use]
    pub fn listeners_for(&self, event: &str) -> usize {
        self.listeners.iter().filter(|(e, _, _)| e == event).count()
    }

    fn listeners_named(&self, event: &str) -> Vec<EventListener> {
        self.listeners
            .iter()
            .filter(|(e, _, _)| e == event)
            .map(|(_, _, listener)| Rc::clone(listener))
            .collect()
    }
}

fn deliver(listeners: Vec<EventListener>, event: &ElementEvent) {
    for listener in listeners {
        if event.is_propagation_stopped() {
            break;
        }
        listener(event);
    }
}

/// Deliver an event to `element`'s listeners as if the user triggered it.
///
/// The element is not borrowed while listeners run, so they may dispatch
/// and let the store update the element synchronously.
pub fn fire(element: &Rc<RefCell<MockElement>>, name: &str, detail: Value) -> ElementEvent {
    let listeners = element.borrow().listeners_named(name);
    let event = ElementEvent::new(name, detail);
    deliver(listeners, &event);
    event
}

impl Element for MockElement {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.props.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: Value) {
        self.ops.push(ElementOp::Set {
            name: name.to_owned(),
            value: value.clone(),
        });
        self.props.insert(name.to_owned(), value);
    }

    fn set_read_only_property(&mut self, name: &str, value: Value) {
        self.ops.push(ElementOp::SetReadOnly {
            name: name.to_owned(),
            value: value.clone(),
        });
        self.props.insert(name.to_owned(), value);
    }

    fn notify_splices(&mut self, name: &str, splices: &[Splice]) {
        self.ops.push(ElementOp::Splices {
            name: name.to_owned(),
            splices: splices.to_vec(),
        });
    }

    fn properties_changed(&mut self, changed: &[String]) {
        self.ops.push(ElementOp::PropertiesChanged(changed.to_vec()));
    }

    fn emit(&mut self, event: &ElementEvent) {
        self.ops.push(ElementOp::Emit {
            name: event.name().to_owned(),
            detail: event.detail().clone(),
        });
        deliver(self.listeners_named(event.name()), event);
    }

    fn add_listener(&mut self, event: &str, listener: EventListener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((event.to_owned(), id, listener));
        self.ops.push(ElementOp::AddListener {
            event: event.to_owned(),
        });
        id
    }

    fn remove_listener(&mut self, event: &str, id: ListenerId) {
        let before = self.listeners.len();
        self.listeners.retain(|(e, l, _)| !(e == event && *l == id));
        if self.listeners.len() < before {
            self.ops.push(ElementOp::RemoveListener {
                event: event.to_owned(),
            });
        }
    }
}
