#![forbid(unsafe_code)]

//! The host element contract.
//!
//! storelink does not render anything. It drives a host component instance
//! through the [`Element`] trait: reading and writing properties, announcing
//! array splices, emitting events, and managing event listeners.
//!
//! # Invariants
//!
//! 1. [`ElementId`]s are unique for the life of the process.
//! 2. [`Element::set_read_only_property`] is the only path used for
//!    read-only properties; [`Element::set_property`] is never called for them.
//! 3. A [`ListenerId`] returned by [`Element::add_listener`] is accepted by
//!    [`Element::remove_listener`] exactly once.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use storelink_core::Splice;

/// Process-unique identity of a connected element instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Handle for a listener registered on an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// An event emitted by or delivered to an element.
#[derive(Debug, Clone)]
pub struct ElementEvent {
    name: String,
    detail: Value,
    stopped: Cell<bool>,
}

impl ElementEvent {
    /// Create an event with a JSON detail payload.
    #[must_use]
    pub fn new(name: impl Into<String>, detail: Value) -> Self {
        Self {
            name: name.into(),
            detail,
            stopped: Cell::new(false),
        }
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event payload.
    #[must_use]
    pub fn detail(&self) -> &Value {
        &self.detail
    }

    /// Prevent any further listeners from seeing this event.
    pub fn stop_immediate_propagation(&self) {
        self.stopped.set(true);
    }

    /// Whether a listener stopped propagation.
    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Callback registered on an element for a named event.
pub type EventListener = Rc<dyn Fn(&ElementEvent)>;

/// A live host component instance.
pub trait Element {
    /// Component tag used in diagnostics (e.g. `"todo-list"`).
    fn tag(&self) -> &str;

    /// Current value of a property, if it has one.
    fn property(&self, name: &str) -> Option<Value>;

    /// Assign a public property.
    fn set_property(&mut self, name: &str, value: Value);

    /// Assign a read-only property through the owner-only setter.
    fn set_read_only_property(&mut self, name: &str, value: Value);

    /// Announce the edits applied to an array property by the last assignment.
    fn notify_splices(&mut self, name: &str, splices: &[Splice]) {
        let _ = (name, splices);
    }

    /// Called once after an update pass that changed at least one property.
    fn properties_changed(&mut self, changed: &[String]) {
        let _ = changed;
    }

    /// Emit an event from this element.
    fn emit(&mut self, event: &ElementEvent);

    /// Register a listener for `event`.
    fn add_listener(&mut self, event: &str, listener: EventListener) -> ListenerId;

    /// Remove a listener previously returned by [`add_listener`](Self::add_listener).
    fn remove_listener(&mut self, event: &str, id: ListenerId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_unique() {
        let a = ElementId::next();
        let b = ElementId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
        assert!(a.to_string().starts_with("element#"));
    }

    #[test]
    fn event_propagation_flag() {
        let event = ElementEvent::new("state-changed", json!({ "count": 1 }));
        assert_eq!(event.name(), "state-changed");
        assert_eq!(event.detail()["count"], 1);
        assert!(!event.is_propagation_stopped());
        event.stop_immediate_propagation();
        assert!(event.is_propagation_stopped());
    }
}
