#![forbid(unsafe_code)]

//! Component definitions and the declarations they carry.
//!
//! A [`ComponentDefinition`] is an ordered list of [`Layer`]s, least-derived
//! first, with the component's own layer last. Each layer declares
//! properties ([`PropertyDescriptor`]) and action creators ([`ActionDecl`]).
//! Collecting a definition flattens those layers with
//! [`storelink_core::flatten`], so a name declared by a more-derived layer
//! masks the same name further up the chain.
//!
//! # Invariants
//!
//! 1. The definition's own layer is always the last (most-derived) layer.
//! 2. Collecting never mutates the definition.
//! 3. Only descriptors with a [`StateSource`] take part in binding.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use storelink_core::{Result, StatePath, flatten};

use crate::action::{Action, Dispatcher, GetStateFn};
use crate::element::{Element, ElementEvent};

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Declared value type of a property. Only `Array` changes binding behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PropertyKind {
    #[default]
    Any,
    Boolean,
    Number,
    String,
    Object,
    Array,
}

/// Computes a property value from the full state and the element.
pub type ComputeFn = Rc<dyn Fn(&Value, &dyn Element) -> Value>;

/// Where a store-derived property takes its value from.
#[derive(Clone)]
pub enum StateSource {
    /// A path into the state snapshot. The root path selects the whole state.
    Path(StatePath),
    /// A pure function of the state and the element.
    Compute(ComputeFn),
}

impl StateSource {
    /// Evaluate against `state`. Missing paths yield `null`.
    #[must_use]
    pub fn evaluate(&self, state: &Value, element: &dyn Element) -> Value {
        match self {
            Self::Path(path) => path.resolve(state).cloned().unwrap_or(Value::Null),
            Self::Compute(f) => f(state, element),
        }
    }
}

impl fmt::Debug for StateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(&path.to_string()).finish(),
            Self::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

impl From<StatePath> for StateSource {
    fn from(path: StatePath) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for StateSource {
    fn from(path: &str) -> Self {
        Self::Path(StatePath::parse(path))
    }
}

/// Declaration of one component property.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    /// Store binding; `None` for ordinary properties.
    pub state_path: Option<StateSource>,
    /// Assigned only through the element's private setter.
    pub read_only: bool,
    /// The element announces changes to this property upward.
    pub notify: bool,
    /// Declared value type.
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// An unbound property of the given kind.
    #[must_use]
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// A property bound to a dotted state path.
    #[must_use]
    pub fn bound(path: impl Into<StatePath>) -> Self {
        Self::default().state_path(path.into())
    }

    /// A property computed from the state.
    #[must_use]
    pub fn computed(f: impl Fn(&Value, &dyn Element) -> Value + 'static) -> Self {
        Self {
            state_path: Some(StateSource::Compute(Rc::new(f))),
            ..Self::default()
        }
    }

    /// Bind to a state source.
    #[must_use]
    pub fn state_path(mut self, source: impl Into<StateSource>) -> Self {
        self.state_path = Some(source.into());
        self
    }

    /// Assign through the element's private setter.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Mark the property as announcing its own changes.
    #[must_use]
    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// Declared value kind; `Array` enables splices.
    #[must_use]
    pub fn kind(mut self, kind: PropertyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the property is fed from the store.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state_path.is_some()
    }
}

/// Flattened property declarations, keyed by property name.
pub type PropertyDescriptorSet = IndexMap<String, PropertyDescriptor>;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// What an action creator sees besides its arguments.
#[derive(Clone, Debug)]
pub struct CreatorContext {
    /// Tag of the dispatching component.
    pub component: String,
    /// Current-state getter.
    pub get_state: GetStateFn,
}

/// Builds an action from dispatch arguments.
pub type ActionCreator = Rc<dyn Fn(&CreatorContext, &[Value]) -> Action>;

/// A declared action creator name.
#[derive(Clone)]
pub enum ActionDecl {
    /// Invocable creator.
    Creator(ActionCreator),
    /// Declared but not invocable; masks inherited creators of the same name.
    Disabled,
}

impl ActionDecl {
    /// Wrap a creator closure.
    pub fn creator(f: impl Fn(&CreatorContext, &[Value]) -> Action + 'static) -> Self {
        Self::Creator(Rc::new(f))
    }
}

impl fmt::Debug for ActionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creator(_) => f.write_str("Creator(..)"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Flattened action creators, keyed by name.
pub type ActionCreatorSet = IndexMap<String, ActionDecl>;

// ---------------------------------------------------------------------------
// Mapping functions
// ---------------------------------------------------------------------------

/// Derives extra property values from the state.
pub type MapStateFn = Rc<dyn Fn(&Value, &dyn Element) -> Map<String, Value>>;

/// Handles one mapped event, given the event and the current state.
pub type EventHandler = Rc<dyn Fn(&ElementEvent, &Value) -> Result<Value>>;

/// Event name to handler.
pub type EventMap = IndexMap<String, EventHandler>;

/// Builds event handlers from the instance's dispatcher.
pub type MapDispatchFn = Rc<dyn Fn(&Dispatcher, &dyn Element) -> EventMap>;

// ---------------------------------------------------------------------------
// Layers and definitions
// ---------------------------------------------------------------------------

/// One level of a component's declaration chain.
#[derive(Clone, Debug, Default)]
pub struct Layer {
    pub name: String,
    pub properties: PropertyDescriptorSet,
    pub actions: ActionCreatorSet,
}

impl Layer {
    /// An empty layer.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.properties.insert(name.into(), descriptor);
        self
    }

    /// Declare an action creator.
    #[must_use]
    pub fn action(mut self, name: impl Into<String>, decl: ActionDecl) -> Self {
        self.actions.insert(name.into(), decl);
        self
    }
}

/// A component type's declarations plus its optional state/dispatch mappers.
#[derive(Clone)]
pub struct ComponentDefinition {
    tag: String,
    layers: Vec<Layer>,
    map_state_to_props: Option<MapStateFn>,
    map_dispatch_to_events: Option<MapDispatchFn>,
}

impl ComponentDefinition {
    /// A definition with an empty own layer.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            layers: vec![Layer::new(tag.clone())],
            tag,
            map_state_to_props: None,
            map_dispatch_to_events: None,
        }
    }

    /// Inherit every layer of `parent`, placed before this definition's layers.
    #[must_use]
    pub fn extends(mut self, parent: &ComponentDefinition) -> Self {
        let mut layers = parent.layers.clone();
        layers.append(&mut self.layers);
        self.layers = layers;
        self
    }

    /// Mix in a behavior layer, placed just below the own layer.
    #[must_use]
    pub fn with_behavior(mut self, layer: Layer) -> Self {
        let at = self.layers.len().saturating_sub(1);
        self.layers.insert(at, layer);
        self
    }

    /// Declare a property on the own layer.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.own_layer().properties.insert(name.into(), descriptor);
        self
    }

    /// Declare an action creator on the own layer.
    #[must_use]
    pub fn action(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&CreatorContext, &[Value]) -> Action + 'static,
    ) -> Self {
        self.own_layer()
            .actions
            .insert(name.into(), ActionDecl::creator(f));
        self
    }

    /// Mask an inherited action creator.
    #[must_use]
    pub fn disable_action(mut self, name: impl Into<String>) -> Self {
        self.own_layer()
            .actions
            .insert(name.into(), ActionDecl::Disabled);
        self
    }

    /// Derive extra property values from each snapshot.
    #[must_use]
    pub fn map_state_to_props(
        mut self,
        f: impl Fn(&Value, &dyn Element) -> Map<String, Value> + 'static,
    ) -> Self {
        self.map_state_to_props = Some(Rc::new(f));
        self
    }

    /// Build event handlers once per instance from its dispatcher.
    #[must_use]
    pub fn map_dispatch_to_events(
        mut self,
        f: impl Fn(&Dispatcher, &dyn Element) -> EventMap + 'static,
    ) -> Self {
        self.map_dispatch_to_events = Some(Rc::new(f));
        self
    }

    /// Element tag this definition describes.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Layers, least-derived first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The `map_state_to_props` function, if any.
    #[must_use]
    pub fn state_mapper(&self) -> Option<&MapStateFn> {
        self.map_state_to_props.as_ref()
    }

    /// The `map_dispatch_to_events` function, if any.
    #[must_use]
    pub fn dispatch_mapper(&self) -> Option<&MapDispatchFn> {
        self.map_dispatch_to_events.as_ref()
    }

    /// Flatten property declarations, most-derived wins.
    #[must_use]
    pub fn collect_properties(&self) -> PropertyDescriptorSet {
        flatten(self.layers.iter().map(|layer| &layer.properties))
    }

    /// Flatten action declarations, most-derived wins.
    #[must_use]
    pub fn collect_actions(&self) -> ActionCreatorSet {
        flatten(self.layers.iter().map(|layer| &layer.actions))
    }

    fn own_layer(&mut self) -> &mut Layer {
        if self.layers.is_empty() {
            self.layers.push(Layer::new(self.tag.clone()));
        }
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("tag", &self.tag)
            .field("layers", &self.layers)
            .field("map_state_to_props", &self.map_state_to_props.is_some())
            .field("map_dispatch_to_events", &self.map_dispatch_to_events.is_some())
            .finish()
    }
}
