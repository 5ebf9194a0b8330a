#![forbid(unsafe_code)]

//! Per-element subscription lifecycle.
//!
//! The [`SubscriptionRegistry`] owns one entry per bound element. An entry
//! holds the teardown that undoes everything `bind` set up: the store
//! subscription and the event listeners added to the element.
//!
//! The registry borrows its own tables only to check, reserve, commit, or
//! remove an entry. Store subscription, listener wiring, and the initial
//! synchronization run with no registry borrow held, so element code may
//! attach or drop other connected elements from inside a setter.
//!
//! # Invariants
//!
//! 1. At most one entry exists per [`ElementId`]; the entry is reserved
//!    before any element code runs, so a nested `bind` of the same element
//!    sees `AlreadyBound`.
//! 2. Each teardown runs exactly once: on `unbind`, when the registry is
//!    dropped, or when a `bind` finds its entry was removed mid-sync.
//! 3. A store listener whose teardown has run never touches the element,
//!    even if the store still invokes it.
//! 4. A notification delivered while the same element is being updated is
//!    coalesced: the update re-reads the state and applies it again once the
//!    current pass (including the state-changed event) has finished.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Notification while the element is being updated | Re-applied after the current pass |
//! | Notification while the element is borrowed elsewhere | Skipped; `ReentrantNotification` is reported |
//! | Updates keep triggering notifications | Stops after [`MAX_RESYNC_PASSES`]; `ReentrantNotification` is reported |
//! | Element borrowed during teardown | Store unsubscribed at once; listener removal deferred, `TeardownDeferred` is reported |
//! | Registry tables borrowed during `unbind_or_defer` | The unbind is queued and runs on the next `bind`, `unbind`, or `flush_deferred` |
//! | Element or store dropped while bound | Notifications become no-ops |
//! | Element borrowed when `bind` adds listeners | Panics (`RefCell` borrow rules) |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use slotmap::{SlotMap, new_key_type};
use storelink_core::{Diagnostic, DiagnosticSink, TracingSink};

use crate::binding::{ApplyReport, Binding};
use crate::config::DEFAULT_STATE_CHANGED_EVENT;
use crate::descriptor::MapStateFn;
use crate::element::{Element, ElementEvent, ElementId, EventListener, ListenerId};
use crate::store::{Listener, Store, Unsubscribe};

/// Upper bound on consecutive re-applications within one update.
pub const MAX_RESYNC_PASSES: usize = 16;

new_key_type! {
    /// Key of a registry entry.
    pub struct SubscriptionId;
}

/// Extra wiring for [`SubscriptionRegistry::bind`].
#[derive(Clone)]
pub struct BindOptions {
    /// Derives additional property values from each snapshot.
    pub map_state_to_props: Option<MapStateFn>,
    /// Event listeners added on bind and removed on unbind.
    pub listeners: Vec<(String, EventListener)>,
    /// Event emitted after each store notification.
    pub state_changed_event: String,
    /// Receives diagnostics raised by updates and teardown.
    pub sink: Rc<dyn DiagnosticSink>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            map_state_to_props: None,
            listeners: Vec::new(),
            state_changed_event: DEFAULT_STATE_CHANGED_EVENT.to_owned(),
            sink: Rc::new(TracingSink),
        }
    }
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events: Vec<&str> = self.listeners.iter().map(|(e, _)| e.as_str()).collect();
        f.debug_struct("BindOptions")
            .field("map_state_to_props", &self.map_state_to_props.is_some())
            .field("listeners", &events)
            .field("state_changed_event", &self.state_changed_event)
            .finish_non_exhaustive()
    }
}

/// Result of [`SubscriptionRegistry::bind`].
#[derive(Debug)]
pub enum BindOutcome {
    /// A new entry was created and the element was synchronized once.
    Bound {
        subscription: SubscriptionId,
        initial: ApplyReport,
    },
    /// The element already had an entry; nothing was done.
    AlreadyBound(SubscriptionId),
}

impl BindOutcome {
    /// Key of the entry, new or existing.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionId {
        match self {
            Self::Bound { subscription, .. } | Self::AlreadyBound(subscription) => *subscription,
        }
    }

    /// Whether this call created the entry.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// Applies snapshots to one element; shared by the store listener and the
/// initial synchronization.
struct Updater {
    binding: Binding,
    map_state: Option<MapStateFn>,
    state_changed_event: String,
    sink: Rc<dyn DiagnosticSink>,
    element: Weak<RefCell<dyn Element>>,
    store: Weak<dyn Store>,
    live: Rc<Cell<bool>>,
    updating: Cell<bool>,
    pending: Cell<bool>,
}

impl Updater {
    /// Store listener body.
    fn notify(&self) {
        if !self.live.get() {
            return;
        }
        if self.updating.get() {
            self.pending.set(true);
            return;
        }
        self.sync(true);
    }

    /// Apply the current state, then keep re-applying while notifications
    /// arrived during the pass. Returns the first pass's report.
    fn sync(&self, emit_first: bool) -> Option<ApplyReport> {
        let (Some(element), Some(store)) = (self.element.upgrade(), self.store.upgrade()) else {
            return None;
        };
        self.updating.set(true);
        let mut emit = emit_first;
        let mut first = None;
        let mut passes = 0;
        loop {
            self.pending.set(false);
            let state = store.get_state();
            {
                let Ok(mut el) = element.try_borrow_mut() else {
                    self.report_reentrant();
                    break;
                };
                let mapped = self.map_state.as_ref().map(|f| f(&state, &*el));
                let report = self.binding.apply(&mut *el, &state, mapped, &*self.sink);
                if emit {
                    el.emit(&ElementEvent::new(self.state_changed_event.as_str(), state));
                }
                if first.is_none() {
                    first = Some(report);
                }
            }
            passes += 1;
            if !self.pending.get() || !self.live.get() {
                break;
            }
            if passes >= MAX_RESYNC_PASSES {
                self.report_reentrant();
                break;
            }
            tracing::trace!(
                target: "storelink::registry",
                component = self.binding.component(),
                pass = passes,
                "re-applying state changed during update"
            );
            emit = true;
        }
        self.pending.set(false);
        self.updating.set(false);
        first
    }

    fn report_reentrant(&self) {
        self.sink.report(Diagnostic::ReentrantNotification {
            component: self.binding.component().to_owned(),
        });
    }
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

struct Teardown {
    component: String,
    live: Rc<Cell<bool>>,
    unsubscribe: Unsubscribe,
    element: Weak<RefCell<dyn Element>>,
    listeners: Vec<(String, ListenerId)>,
    sink: Rc<dyn DiagnosticSink>,
    reported: bool,
}

impl Teardown {
    /// Undo the binding. Returns `self` when listener removal must be retried.
    fn run(mut self) -> Option<Self> {
        self.live.set(false);
        self.unsubscribe.call();
        if self.listeners.is_empty() {
            return None;
        }
        let element = self.element.upgrade()?;
        let Ok(mut el) = element.try_borrow_mut() else {
            if !self.reported {
                self.reported = true;
                self.sink.report(Diagnostic::TeardownDeferred {
                    component: self.component.clone(),
                });
            }
            return Some(self);
        };
        for (event, id) in self.listeners.drain(..) {
            el.remove_listener(&event, id);
        }
        None
    }
}

enum Deferred {
    Unbind(ElementId),
    Teardown(Teardown),
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Entry {
    element: ElementId,
    component: String,
    /// `None` while `bind` is still wiring the element.
    teardown: Option<Teardown>,
}

#[derive(Default)]
struct Tables {
    entries: SlotMap<SubscriptionId, Entry>,
    by_element: AHashMap<ElementId, SubscriptionId>,
}

/// Registry of bound elements.
#[derive(Default)]
pub struct SubscriptionRegistry {
    tables: RefCell<Tables>,
    deferred: RefCell<Vec<Deferred>>,
}

impl SubscriptionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `element` to `store`.
    ///
    /// Subscribes a store listener, adds the event listeners, and performs
    /// one synchronization with the current state. The initial
    /// synchronization does not emit the state-changed event. If the entry
    /// is removed while the initial synchronization runs, the new binding is
    /// torn down before returning.
    pub fn bind(
        &self,
        id: ElementId,
        element: &Rc<RefCell<dyn Element>>,
        store: &Rc<dyn Store>,
        binding: Binding,
        options: BindOptions,
    ) -> BindOutcome {
        self.flush_deferred();

        let component = binding.component().to_owned();
        let subscription = {
            let mut tables = self.tables.borrow_mut();
            if let Some(&existing) = tables.by_element.get(&id) {
                return BindOutcome::AlreadyBound(existing);
            }
            let subscription = tables.entries.insert(Entry {
                element: id,
                component: component.clone(),
                teardown: None,
            });
            tables.by_element.insert(id, subscription);
            subscription
        };

        let BindOptions {
            map_state_to_props,
            listeners,
            state_changed_event,
            sink,
        } = options;
        let bound = binding.len();
        let live = Rc::new(Cell::new(true));
        let updater = Rc::new(Updater {
            binding,
            map_state: map_state_to_props,
            state_changed_event,
            sink: Rc::clone(&sink),
            element: Rc::downgrade(element),
            store: Rc::downgrade(store),
            live: Rc::clone(&live),
            updating: Cell::new(false),
            pending: Cell::new(false),
        });

        let listener: Listener = {
            let updater = Rc::clone(&updater);
            Rc::new(move || updater.notify())
        };
        let unsubscribe = store.subscribe(listener);

        let added: Vec<(String, ListenerId)> = {
            let mut el = element.borrow_mut();
            listeners
                .into_iter()
                .map(|(event, listener)| {
                    let listener_id = el.add_listener(&event, listener);
                    (event, listener_id)
                })
                .collect()
        };
        let initial = updater.sync(false).unwrap_or_default();

        let teardown = Teardown {
            component: component.clone(),
            live,
            unsubscribe,
            element: Rc::downgrade(element),
            listeners: added,
            sink,
            reported: false,
        };
        let orphan = {
            let mut tables = self.tables.borrow_mut();
            match tables.entries.get_mut(subscription) {
                Some(entry) => {
                    entry.teardown = Some(teardown);
                    None
                }
                None => Some(teardown),
            }
        };
        if let Some(teardown) = orphan {
            tracing::debug!(
                target: "storelink::registry",
                component = %component,
                element = %id,
                "unbound during initial sync"
            );
            self.finish(teardown);
        } else {
            tracing::debug!(
                target: "storelink::registry",
                component = %component,
                element = %id,
                bound,
                "bound element"
            );
        }
        BindOutcome::Bound {
            subscription,
            initial,
        }
    }

    /// Tear down the entry for `id`. Returns `false` if there was none.
    pub fn unbind(&self, id: ElementId) -> bool {
        self.flush_deferred();
        self.remove(id)
    }

    /// Like [`unbind`](Self::unbind), but queues the unbind when the
    /// registry is busy instead of panicking. Used from `Drop`.
    pub fn unbind_or_defer(&self, id: ElementId) {
        if self.tables.try_borrow_mut().is_ok() {
            self.unbind(id);
        } else {
            tracing::debug!(target: "storelink::registry", element = %id, "unbind deferred");
            self.deferred.borrow_mut().push(Deferred::Unbind(id));
        }
    }

    /// Run queued unbinds and retry listener removals that found their
    /// element borrowed.
    pub fn flush_deferred(&self) {
        let queued = std::mem::take(&mut *self.deferred.borrow_mut());
        for item in queued {
            match item {
                Deferred::Unbind(id) => {
                    self.remove(id);
                }
                Deferred::Teardown(teardown) => self.finish(teardown),
            }
        }
    }

    /// Number of queued unbinds and pending listener removals.
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Whether `id` has an entry (including one still being bound).
    #[must_use]
    pub fn is_bound(&self, id: ElementId) -> bool {
        self.tables.borrow().by_element.contains_key(&id)
    }

    /// Key of the entry for `id`.
    #[must_use]
    pub fn subscription(&self, id: ElementId) -> Option<SubscriptionId> {
        self.tables.borrow().by_element.get(&id).copied()
    }

    /// Element bound under `subscription`.
    #[must_use]
    pub fn element(&self, subscription: SubscriptionId) -> Option<ElementId> {
        self.tables
            .borrow()
            .entries
            .get(subscription)
            .map(|entry| entry.element)
    }

    /// Number of entries, including ones still being bound.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.borrow().entries.len()
    }

    /// Whether no element is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.borrow().entries.is_empty()
    }

    fn remove(&self, id: ElementId) -> bool {
        let entry = {
            let mut tables = self.tables.borrow_mut();
            let Some(subscription) = tables.by_element.remove(&id) else {
                return false;
            };
            tables.entries.remove(subscription)
        };
        let Some(entry) = entry else {
            return false;
        };
        tracing::debug!(
            target: "storelink::registry",
            component = %entry.component,
            element = %entry.element,
            "unbound element"
        );
        // A missing teardown means `bind` is mid-sync; it tears down itself.
        if let Some(teardown) = entry.teardown {
            self.finish(teardown);
        }
        true
    }

    fn finish(&self, teardown: Teardown) {
        if let Some(rest) = teardown.run() {
            self.deferred.borrow_mut().push(Deferred::Teardown(rest));
        }
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        let tables = std::mem::take(self.tables.get_mut());
        for (_, entry) in tables.entries {
            if let Some(teardown) = entry.teardown {
                teardown.run();
            }
        }
        for item in std::mem::take(self.deferred.get_mut()) {
            if let Deferred::Teardown(teardown) = item {
                teardown.run();
            }
        }
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("len", &self.len())
            .field("deferred", &self.deferred_len())
            .finish()
    }
}
