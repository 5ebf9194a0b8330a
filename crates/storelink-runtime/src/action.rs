#![forbid(unsafe_code)]

//! Actions, thunks, and dispatch requests.
//!
//! A store accepts an [`Action`]: either a plain JSON value or a [`Thunk`]
//! that store middleware invokes with a dispatcher and a state getter.
//! Components dispatch a [`DispatchRequest`], which additionally allows
//! naming one of the component's action creators.
//!
//! | Request | Meaning |
//! |---------|---------|
//! | `ByName { name, args }` | Call the named action creator, dispatch what it returns |
//! | `Plain(value)` | Dispatch the value unchanged |
//! | `Thunk(thunk)` | Dispatch a deferred computation |

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use storelink_core::Result;

/// Reads the current state of a store.
pub type GetState = Rc<dyn Fn() -> Value>;

/// A cloneable dispatch entry point handed to thunks and event mappers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Rc<dyn Fn(DispatchRequest) -> Result<Value>>,
}

impl Dispatcher {
    /// Wrap a dispatch function.
    pub fn new(f: impl Fn(DispatchRequest) -> Result<Value> + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    /// Dispatch a request.
    pub fn dispatch(&self, request: impl Into<DispatchRequest>) -> Result<Value> {
        (self.inner)(request.into())
    }

    /// Dispatch the named action creator with `args`.
    pub fn dispatch_named(&self, name: impl Into<String>, args: Vec<Value>) -> Result<Value> {
        self.dispatch(DispatchRequest::named(name, args))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Arguments store middleware passes to a thunk.
#[derive(Clone, Debug)]
pub struct ThunkArgs {
    /// Dispatch entry point for nested dispatches.
    pub dispatch: Dispatcher,
    /// Current-state getter.
    pub get_state: GetStateFn,
    /// Extra middleware arguments.
    pub extra: Vec<Value>,
}

/// Debug-printable wrapper around a [`GetState`] closure.
#[derive(Clone)]
pub struct GetStateFn(pub GetState);

impl GetStateFn {
    /// Read the current state.
    #[must_use]
    pub fn call(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for GetStateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GetStateFn")
    }
}

#[derive(Clone)]
enum ThunkBody {
    Deferred(Rc<dyn Fn() -> Value>),
    Middleware(Rc<dyn Fn(ThunkArgs) -> Result<Value>>),
}

/// A deferred action run by store middleware.
///
/// Thunks carry an ordered metadata map. Middleware that inspects action
/// creator metadata reads it from here, and proxies built around a thunk
/// keep a copy of it.
#[derive(Clone)]
pub struct Thunk {
    body: ThunkBody,
    meta: IndexMap<String, Value>,
}

impl Thunk {
    /// A thunk taking middleware arguments.
    pub fn new(f: impl Fn(ThunkArgs) -> Result<Value> + 'static) -> Self {
        Self {
            body: ThunkBody::Middleware(Rc::new(f)),
            meta: IndexMap::new(),
        }
    }

    /// A zero-parameter thunk producing an action value.
    ///
    /// This is the legacy calling convention: the dispatcher runs it
    /// immediately and dispatches what it returns.
    pub fn deferred(f: impl Fn() -> Value + 'static) -> Self {
        Self {
            body: ThunkBody::Deferred(Rc::new(f)),
            meta: IndexMap::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Metadata entries.
    #[must_use]
    pub fn meta(&self) -> &IndexMap<String, Value> {
        &self.meta
    }

    /// Replace all metadata entries.
    #[must_use]
    pub fn with_meta_map(mut self, meta: IndexMap<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    /// Number of declared parameters: 0 for deferred thunks, 1 otherwise.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self.body {
            ThunkBody::Deferred(_) => 0,
            ThunkBody::Middleware(_) => 1,
        }
    }

    /// Whether this is a zero-parameter thunk.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        self.arity() == 0
    }

    /// Run the thunk as store middleware would.
    ///
    /// Deferred thunks ignore `args` and return the action they produce.
    pub fn invoke(&self, args: ThunkArgs) -> Result<Value> {
        match &self.body {
            ThunkBody::Deferred(f) => Ok(f()),
            ThunkBody::Middleware(f) => f(args),
        }
    }

    /// Run a deferred thunk without arguments.
    ///
    /// Returns `None` for thunks that expect middleware arguments.
    #[must_use]
    pub fn run_deferred(&self) -> Option<Value> {
        match &self.body {
            ThunkBody::Deferred(f) => Some(f()),
            ThunkBody::Middleware(_) => None,
        }
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("arity", &self.arity())
            .field("meta", &self.meta)
            .finish()
    }
}

/// What a store's dispatch accepts.
#[derive(Clone, Debug)]
pub enum Action {
    /// A plain action value, typically an object with a `type` field.
    Plain(Value),
    /// A deferred action for thunk middleware.
    Thunk(Thunk),
}

impl Action {
    /// The plain value, if this is a plain action.
    #[must_use]
    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            Self::Plain(value) => Some(value),
            Self::Thunk(_) => None,
        }
    }
}

impl From<Value> for Action {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl From<Thunk> for Action {
    fn from(thunk: Thunk) -> Self {
        Self::Thunk(thunk)
    }
}

/// What a component's dispatch accepts.
#[derive(Clone, Debug)]
pub enum DispatchRequest {
    /// Invoke the named action creator with `args`.
    ByName { name: String, args: Vec<Value> },
    /// Dispatch a plain value unchanged.
    Plain(Value),
    /// Dispatch a thunk.
    Thunk(Thunk),
}

impl DispatchRequest {
    /// Request the named action creator.
    #[must_use]
    pub fn named(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::ByName {
            name: name.into(),
            args,
        }
    }
}

impl From<Value> for DispatchRequest {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

impl From<Thunk> for DispatchRequest {
    fn from(thunk: Thunk) -> Self {
        Self::Thunk(thunk)
    }
}

impl From<Action> for DispatchRequest {
    fn from(action: Action) -> Self {
        match action {
            Action::Plain(value) => Self::Plain(value),
            Action::Thunk(thunk) => Self::Thunk(thunk),
        }
    }
}

impl From<&str> for DispatchRequest {
    fn from(name: &str) -> Self {
        Self::named(name, Vec::new())
    }
}
