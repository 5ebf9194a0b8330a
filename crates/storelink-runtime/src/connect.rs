#![forbid(unsafe_code)]

//! Connecting component definitions to a store.
//!
//! A [`Connector`] is created once per store. It augments component
//! definitions into [`ConnectedComponent`]s, which cache the flattened
//! declarations of their type, and those instantiate [`Connected`] elements
//! that bind on [`attach`](Connected::attach) and unbind on
//! [`detach`](Connected::detach).
//!
//! ```ignore
//! let connector = Connector::new(store)?;
//! let counter = connector.augment(
//!     ComponentDefinition::new("x-counter")
//!         .property("count", PropertyDescriptor::bound("count"))
//!         .action("increment", |_, _| Action::Plain(json!({ "type": "INCREMENT" }))),
//! );
//!
//! let el = counter.instantiate(MyElement::default());
//! el.attach();
//! el.dispatch_named("increment", vec![])?;
//! el.detach();
//! ```
//!
//! # Invariants
//!
//! 1. Declarations are collected once per [`ConnectedComponent`], not per
//!    instance.
//! 2. `map_dispatch_to_events` runs once per instance, at instantiation.
//! 3. Attaching twice binds once; detaching an unattached element does
//!    nothing; dropping an attached element detaches it.
//! 4. Mapped event handlers stop immediate propagation and see the state
//!    current at the time the event fires.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use storelink_core::{ConfigError, Diagnostic, DiagnosticSink, Result, TracingSink};

use crate::action::{DispatchRequest, Dispatcher};
use crate::binding::Binding;
use crate::config::ConnectConfig;
use crate::descriptor::{ActionCreatorSet, ComponentDefinition, EventHandler, PropertyDescriptorSet};
use crate::dispatch::Resolver;
use crate::element::{Element, ElementEvent, ElementId, EventListener};
use crate::registry::{BindOptions, BindOutcome, SubscriptionRegistry};
use crate::store::{self, Store};

/// Binds component definitions to one store.
#[derive(Clone)]
pub struct Connector {
    store: Rc<dyn Store>,
    registry: Rc<SubscriptionRegistry>,
    config: Rc<ConnectConfig>,
    sink: Rc<dyn DiagnosticSink>,
}

impl Connector {
    /// Create a connector for `store`, checking that it is usable.
    pub fn new(store: Rc<dyn Store>) -> std::result::Result<Self, ConfigError> {
        store::validate(&*store)?;
        Ok(Self {
            store,
            registry: Rc::new(SubscriptionRegistry::new()),
            config: Rc::new(ConnectConfig::default()),
            sink: Rc::new(TracingSink),
        })
    }

    /// Like [`new`](Self::new), reporting a missing store as an error.
    pub fn from_optional(store: Option<Rc<dyn Store>>) -> std::result::Result<Self, ConfigError> {
        store.map_or(Err(ConfigError::MissingStore), Self::new)
    }

    /// Replace the policy. Components augmented earlier keep the old one.
    pub fn with_config(mut self, config: ConnectConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        self.config = Rc::new(config);
        Ok(self)
    }

    /// Route diagnostics to `sink` instead of `tracing`.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The store every connected element binds to.
    #[must_use]
    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    /// Policy applied to components augmented from now on.
    #[must_use]
    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    /// Collect `definition`'s declarations and return the connected type.
    #[must_use]
    pub fn augment(&self, definition: ComponentDefinition) -> ConnectedComponent {
        let properties = definition.collect_properties();
        let actions = Rc::new(definition.collect_actions());
        tracing::debug!(
            target: "storelink::connect",
            component = definition.tag(),
            properties = properties.len(),
            actions = actions.len(),
            "augmented component"
        );
        ConnectedComponent {
            shared: Rc::new(Shared {
                definition,
                properties,
                actions,
                store: Rc::clone(&self.store),
                registry: Rc::clone(&self.registry),
                config: Rc::clone(&self.config),
                sink: Rc::clone(&self.sink),
            }),
        }
    }

    /// Number of currently attached elements across all components.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.registry.len()
    }

    /// Retry unbinds and listener removals that were deferred because the
    /// registry or an element was borrowed at the time.
    ///
    /// The registry also does this on every attach and detach.
    pub fn flush_deferred(&self) {
        self.registry.flush_deferred();
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

struct Shared {
    definition: ComponentDefinition,
    properties: PropertyDescriptorSet,
    actions: Rc<ActionCreatorSet>,
    store: Rc<dyn Store>,
    registry: Rc<SubscriptionRegistry>,
    config: Rc<ConnectConfig>,
    sink: Rc<dyn DiagnosticSink>,
}

/// A component type wired to a store.
#[derive(Clone)]
pub struct ConnectedComponent {
    shared: Rc<Shared>,
}

impl ConnectedComponent {
    /// Tag of the wrapped definition.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.shared.definition.tag()
    }

    /// The definition this component was augmented from.
    #[must_use]
    pub fn definition(&self) -> &ComponentDefinition {
        &self.shared.definition
    }

    /// Flattened property declarations.
    #[must_use]
    pub fn properties(&self) -> &PropertyDescriptorSet {
        &self.shared.properties
    }

    /// Flattened action creators.
    #[must_use]
    pub fn actions(&self) -> &ActionCreatorSet {
        &self.shared.actions
    }

    /// Wrap `element` as an instance of this component.
    pub fn instantiate<E: Element + 'static>(&self, element: E) -> Connected<E> {
        self.instantiate_shared(Rc::new(RefCell::new(element)))
    }

    /// Wrap an already shared element.
    pub fn instantiate_shared<E: Element + 'static>(&self, element: Rc<RefCell<E>>) -> Connected<E> {
        let shared = &self.shared;
        let resolver = Resolver::new(
            self.tag(),
            Rc::clone(&shared.actions),
            Rc::clone(&shared.store),
            shared.config.legacy_thunks,
        );

        let listeners = match shared.definition.dispatch_mapper() {
            Some(map_dispatch) => {
                let events = map_dispatch(&resolver.dispatcher(), &*element.borrow());
                events
                    .into_iter()
                    .map(|(event, handler)| {
                        let listener = self.wrap_handler(event.clone(), handler);
                        (event, listener)
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        Connected {
            id: ElementId::next(),
            element,
            component: self.clone(),
            resolver,
            listeners,
        }
    }

    fn wrap_handler(&self, event_name: String, handler: EventHandler) -> EventListener {
        let store = Rc::clone(&self.shared.store);
        let sink = Rc::clone(&self.shared.sink);
        let component = self.tag().to_owned();
        Rc::new(move |event: &ElementEvent| {
            event.stop_immediate_propagation();
            let state = store.get_state();
            if let Err(err) = handler(event, &state) {
                sink.report(Diagnostic::ListenerFailed {
                    component: component.clone(),
                    event: event_name.clone(),
                    reason: err.to_string(),
                });
            }
        })
    }
}

impl fmt::Debug for ConnectedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedComponent")
            .field("tag", &self.tag())
            .field("properties", &self.shared.properties.keys().collect::<Vec<_>>())
            .field("actions", &self.shared.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One live, connected element.
pub struct Connected<E: Element + 'static> {
    id: ElementId,
    element: Rc<RefCell<E>>,
    component: ConnectedComponent,
    resolver: Resolver,
    listeners: Vec<(String, EventListener)>,
}

impl<E: Element + 'static> Connected<E> {
    /// Bind to the store and synchronize once. Attaching again does nothing.
    pub fn attach(&self) -> BindOutcome {
        let shared = &self.component.shared;
        if let Some(existing) = shared.registry.subscription(self.id) {
            return BindOutcome::AlreadyBound(existing);
        }

        let binding = Binding::compute(
            self.component.tag(),
            &shared.properties,
            shared.config.double_binding,
            &*shared.sink,
        );
        let options = BindOptions {
            map_state_to_props: shared.definition.state_mapper().cloned(),
            listeners: self.listeners.clone(),
            state_changed_event: shared.config.state_changed_event.clone(),
            sink: Rc::clone(&shared.sink),
        };
        let element: Rc<RefCell<dyn Element>> = self.element.clone();
        shared
            .registry
            .bind(self.id, &element, &shared.store, binding, options)
    }

    /// Unbind from the store. Returns `false` if the element was not attached.
    pub fn detach(&self) -> bool {
        self.component.shared.registry.unbind(self.id)
    }

    /// Whether the element currently has a registry entry.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.component.shared.registry.is_bound(self.id)
    }

    /// Dispatch a plain action, a thunk, or an action creator name.
    pub fn dispatch(&self, request: impl Into<DispatchRequest>) -> Result<Value> {
        self.resolver.dispatch(request)
    }

    /// Dispatch the named action creator with `args`.
    pub fn dispatch_named(&self, name: impl Into<String>, args: Vec<Value>) -> Result<Value> {
        self.resolver.dispatch(DispatchRequest::named(name, args))
    }

    /// A dispatcher bound to this instance's action creators.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        self.resolver.dispatcher()
    }

    /// Current store snapshot.
    #[must_use]
    pub fn get_state(&self) -> Value {
        self.resolver.get_state()
    }

    /// The wrapped element.
    #[must_use]
    pub fn element(&self) -> &Rc<RefCell<E>> {
        &self.element
    }

    /// Registry identity of this instance.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The connected type this instance belongs to.
    #[must_use]
    pub fn component(&self) -> &ConnectedComponent {
        &self.component
    }
}

impl<E: Element + 'static> Drop for Connected<E> {
    fn drop(&mut self) {
        self.component.shared.registry.unbind_or_defer(self.id);
    }
}

impl<E: Element + 'static> fmt::Debug for Connected<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connected")
            .field("id", &self.id)
            .field("component", &self.component.tag())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::descriptor::{EventMap, PropertyDescriptor, PropertyKind};
    use crate::element::ListenerId;
    use crate::store::{StoreAdapter, Unsubscribe};
    use crate::test_support::{Bus, Node, fire};
    use serde_json::json;
    use storelink_core::{CollectingSink, Error};

    fn counter() -> ComponentDefinition {
        ComponentDefinition::new("x-counter")
            .property("count", PropertyDescriptor::bound("count"))
            .property(
                "items",
                PropertyDescriptor::bound("items").kind(PropertyKind::Array),
            )
            .action("bump", |_, _| Action::Plain(json!({ "type": "BUMP" })))
    }

    fn connector(bus: &Rc<Bus>, sink: &Rc<CollectingSink>) -> Connector {
        let store: Rc<dyn Store> = bus.clone();
        Connector::new(store)
            .unwrap()
            .with_diagnostics(sink.clone())
    }

    #[test]
    fn construction_validates_store() {
        assert_eq!(
            Connector::from_optional(None).unwrap_err(),
            ConfigError::MissingStore
        );
        let partial: Rc<dyn Store> = Rc::new(
            StoreAdapter::new()
                .with_get_state(|| json!({}))
                .with_subscribe(|_| Unsubscribe::noop()),
        );
        assert_eq!(
            Connector::new(partial).unwrap_err(),
            ConfigError::MissingCapability {
                capability: "dispatch"
            }
        );
        let bad = ConnectConfig::new().state_changed_event("");
        let bus: Rc<dyn Store> = Bus::new(json!({}));
        assert!(Connector::new(bus).unwrap().with_config(bad).is_err());
    }

    #[test]
    fn attach_detach_lifecycle() {
        let bus = Bus::new(json!({ "count": 1, "items": [] }));
        let sink = Rc::new(CollectingSink::new());
        let connector = connector(&bus, &sink);
        let el = connector.augment(counter()).instantiate(Node::default());

        assert!(!el.is_attached());
        assert!(el.attach().is_new());
        assert!(!el.attach().is_new());
        assert_eq!(connector.bound_count(), 1);
        assert_eq!(el.element().borrow().props["count"], json!(1));

        bus.set(json!({ "count": 2, "items": ["a"] }));
        assert_eq!(el.element().borrow().props["count"], json!(2));
        assert_eq!(el.element().borrow().events, ["state-changed"]);
        assert_eq!(el.element().borrow().splices.len(), 1);

        assert!(el.detach());
        assert!(!el.detach());
        assert_eq!(bus.listener_count(), 0);
        bus.set(json!({ "count": 3 }));
        assert_eq!(el.element().borrow().props["count"], json!(2));
    }

    #[test]
    fn reattach_after_detach_rebinds() {
        let bus = Bus::new(json!({ "count": 1 }));
        let sink = Rc::new(CollectingSink::new());
        let el = connector(&bus, &sink)
            .augment(counter())
            .instantiate(Node::default());
        el.attach();
        el.detach();
        bus.set(json!({ "count": 4 }));
        assert!(el.attach().is_new());
        assert_eq!(el.element().borrow().props["count"], json!(4));
    }

    #[test]
    fn drop_detaches() {
        let bus = Bus::new(json!({ "count": 1 }));
        let sink = Rc::new(CollectingSink::new());
        let connector = connector(&bus, &sink);
        {
            let el = connector.augment(counter()).instantiate(Node::default());
            el.attach();
            assert_eq!(bus.listener_count(), 1);
        }
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(connector.bound_count(), 0);
    }

    #[test]
    fn two_way_warning_not_repeated_on_double_attach() {
        let bus = Bus::new(json!({}));
        let sink = Rc::new(CollectingSink::new());
        let def = ComponentDefinition::new("x-form")
            .property("draft", PropertyDescriptor::bound("draft").notify(true));
        let el = connector(&bus, &sink).augment(def).instantiate(Node::default());
        el.attach();
        el.attach();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn dispatch_routes_through_creators() {
        let bus = Bus::new(json!({}));
        let sink = Rc::new(CollectingSink::new());
        let el = connector(&bus, &sink)
            .augment(counter())
            .instantiate(Node::default());

        el.dispatch_named("bump", vec![]).unwrap();
        el.dispatch(json!({ "type": "RAW" })).unwrap();
        assert!(matches!(
            el.dispatch("missing"),
            Err(Error::UnknownActionCreator { .. })
        ));
        assert_eq!(
            *bus.dispatched.borrow(),
            vec![json!({ "type": "BUMP" }), json!({ "type": "RAW" })]
        );
    }

    #[test]
    fn mapped_events_stop_propagation_and_see_state() {
        let bus = Bus::new(json!({ "count": 10 }));
        let sink = Rc::new(CollectingSink::new());
        let def = counter().map_dispatch_to_events(|dispatch, _| {
            let dispatch = dispatch.clone();
            let mut events = EventMap::new();
            events.insert(
                "tap".into(),
                Rc::new(move |event: &ElementEvent, state: &Value| {
                    dispatch.dispatch(json!({ "type": "TAP", "at": state["count"], "detail": event.detail() }))
                }),
            );
            events.insert(
                "fail".into(),
                Rc::new(|_: &ElementEvent, _: &Value| -> Result<Value> {
                    Err(Error::Rejected {
                        reason: "nope".into(),
                    })
                }),
            );
            events
        });
        let el = connector(&bus, &sink).augment(def).instantiate(Node::default());

        // Not attached yet: no listeners.
        assert_eq!(el.element().borrow().listener_count(), 0);
        el.attach();
        assert_eq!(el.element().borrow().listener_count(), 2);

        let event = fire(el.element(), "tap", json!(1));
        assert!(event.is_propagation_stopped());
        assert_eq!(
            bus.dispatched.borrow()[0],
            json!({ "type": "TAP", "at": 10, "detail": 1 })
        );

        fire(el.element(), "fail", Value::Null);
        assert!(matches!(
            sink.diagnostics().last(),
            Some(Diagnostic::ListenerFailed { event, .. }) if event == "fail"
        ));

        el.detach();
        assert_eq!(el.element().borrow().listener_count(), 0);
    }

    #[test]
    fn declarations_are_shared_by_instances() {
        let bus = Bus::new(json!({}));
        let sink = Rc::new(CollectingSink::new());
        let component = connector(&bus, &sink).augment(counter());
        let a = component.instantiate(Node::default());
        let b = component.instantiate(Node::default());
        assert_ne!(a.id(), b.id());
        assert!(std::ptr::eq(
            a.component().properties(),
            b.component().properties()
        ));
        assert_eq!(component.actions().len(), 1);
    }

    /// Keeps one connected child per unit of its `count` property.
    struct Parent {
        count: Value,
        child_type: ConnectedComponent,
        children: Vec<Connected<Node>>,
    }

    impl Element for Parent {
        fn tag(&self) -> &str {
            "x-parent"
        }

        fn property(&self, name: &str) -> Option<Value> {
            (name == "count").then(|| self.count.clone())
        }

        fn set_property(&mut self, name: &str, value: Value) {
            if name != "count" {
                return;
            }
            let wanted = usize::try_from(value.as_u64().unwrap_or(0)).unwrap_or(0);
            self.children.truncate(wanted);
            while self.children.len() < wanted {
                let child = self.child_type.instantiate(Node::default());
                child.attach();
                self.children.push(child);
            }
            self.count = value;
        }

        fn set_read_only_property(&mut self, name: &str, value: Value) {
            self.set_property(name, value);
        }

        fn emit(&mut self, _event: &ElementEvent) {}

        fn add_listener(&mut self, _event: &str, _listener: EventListener) -> ListenerId {
            ListenerId(0)
        }

        fn remove_listener(&mut self, _event: &str, _id: ListenerId) {}
    }

    #[test]
    fn setters_may_attach_and_drop_other_elements() {
        let bus = Bus::new(json!({ "count": 2 }));
        let sink = Rc::new(CollectingSink::new());
        let connector = connector(&bus, &sink);
        let child_type = connector.augment(
            ComponentDefinition::new("x-child")
                .property("count", PropertyDescriptor::bound("count")),
        );
        let parent = connector
            .augment(
                ComponentDefinition::new("x-parent")
                    .property("count", PropertyDescriptor::bound("count")),
            )
            .instantiate(Parent {
                count: Value::Null,
                child_type,
                children: Vec::new(),
            });

        assert!(parent.attach().is_new());
        assert_eq!(connector.bound_count(), 3);
        assert_eq!(bus.listener_count(), 3);
        for child in &parent.element().borrow().children {
            assert!(child.is_attached());
            assert_eq!(child.element().borrow().props["count"], json!(2));
        }

        // Shrinking drops a child from inside the parent's update.
        bus.set(json!({ "count": 1 }));
        assert_eq!(connector.bound_count(), 2);
        assert_eq!(bus.listener_count(), 2);
        assert_eq!(
            parent.element().borrow().children[0].element().borrow().props["count"],
            json!(1)
        );
        assert!(sink.is_empty());

        parent.detach();
        parent.element().borrow_mut().children.clear();
        assert_eq!(connector.bound_count(), 0);
        assert_eq!(bus.listener_count(), 0);
    }
}
