#![forbid(unsafe_code)]

//! Dispatch resolution for one component.
//!
//! A component may dispatch a plain action, a thunk, or the name of one of
//! its action creators. [`Resolver`] turns any of those into exactly one call
//! to the store's `dispatch`.
//!
//! | Request | Sent to the store |
//! |---------|-------------------|
//! | `ByName` | Whatever the creator returns, resolved again by the rows below |
//! | Deferred thunk, legacy on | The plain action the thunk produces |
//! | Middleware thunk | A proxy thunk whose nested dispatches come back through this resolver |
//! | Plain value | The value unchanged |
//!
//! # Invariants
//!
//! 1. Each call to [`Resolver::dispatch`] calls the store's `dispatch` at
//!    most once, and exactly once unless by-name resolution fails.
//! 2. A proxy thunk carries the metadata of the thunk it wraps.
//! 3. Only by-name requests are validated locally.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use storelink_core::{Error, Result, UnknownReason};

use crate::action::{Action, DispatchRequest, Dispatcher, GetStateFn, Thunk};
use crate::descriptor::{ActionCreatorSet, ActionDecl, CreatorContext};
use crate::store::Store;

struct ResolverInner {
    component: String,
    actions: Rc<ActionCreatorSet>,
    store: Rc<dyn Store>,
    legacy_thunks: bool,
}

/// Resolves dispatch requests for one component instance.
#[derive(Clone)]
pub struct Resolver {
    inner: Rc<ResolverInner>,
}

impl Resolver {
    /// A resolver for `component` that looks names up in `actions` and sends
    /// the result to `store`. With `legacy_thunks`, a deferred thunk is
    /// run here and its result dispatched.
    pub fn new(
        component: impl Into<String>,
        actions: Rc<ActionCreatorSet>,
        store: Rc<dyn Store>,
        legacy_thunks: bool,
    ) -> Self {
        Self {
            inner: Rc::new(ResolverInner {
                component: component.into(),
                actions,
                store,
                legacy_thunks,
            }),
        }
    }

    /// Tag passed to action creators as their component.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.inner.component
    }

    /// Resolve `request` and hand the result to the store.
    pub fn dispatch(&self, request: impl Into<DispatchRequest>) -> Result<Value> {
        let action = self.resolve(request.into())?;
        tracing::trace!(
            target: "storelink::dispatch",
            component = %self.inner.component,
            thunk = matches!(action, Action::Thunk(_)),
            "dispatching"
        );
        self.inner.store.dispatch(action)
    }

    /// Resolve `request` into the action the store will receive.
    pub fn resolve(&self, request: DispatchRequest) -> Result<Action> {
        let action = match request {
            DispatchRequest::ByName { name, args } => self.create(&name, &args)?,
            DispatchRequest::Plain(value) => Action::Plain(value),
            DispatchRequest::Thunk(thunk) => Action::Thunk(thunk),
        };
        Ok(match action {
            Action::Thunk(thunk) if thunk.is_deferred() && self.inner.legacy_thunks => {
                Action::Plain(thunk.run_deferred().unwrap_or(Value::Null))
            }
            Action::Thunk(thunk) if !thunk.is_deferred() => Action::Thunk(self.proxy(thunk)),
            other => other,
        })
    }

    /// A dispatcher that routes through this resolver.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        let resolver = self.clone();
        Dispatcher::new(move |request| resolver.dispatch(request))
    }

    /// Current store state.
    #[must_use]
    pub fn get_state(&self) -> Value {
        self.inner.store.get_state()
    }

    fn create(&self, name: &str, args: &[Value]) -> Result<Action> {
        let creator = match self.inner.actions.get(name) {
            Some(ActionDecl::Creator(creator)) => creator,
            Some(ActionDecl::Disabled) => return Err(self.unknown(name, UnknownReason::NotInvocable)),
            None => return Err(self.unknown(name, UnknownReason::Missing)),
        };
        let store = Rc::clone(&self.inner.store);
        let context = CreatorContext {
            component: self.inner.component.clone(),
            get_state: GetStateFn(Rc::new(move || store.get_state())),
        };
        Ok(creator(&context, args))
    }

    fn proxy(&self, thunk: Thunk) -> Thunk {
        let meta = thunk.meta().clone();
        let resolver = self.clone();
        Thunk::new(move |mut args| {
            args.dispatch = resolver.dispatcher();
            thunk.invoke(args)
        })
        .with_meta_map(meta)
    }

    fn unknown(&self, action: &str, reason: UnknownReason) -> Error {
        Error::UnknownActionCreator {
            component: self.inner.component.clone(),
            action: action.to_owned(),
            reason,
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("component", &self.inner.component)
            .field("actions", &self.inner.actions.keys().collect::<Vec<_>>())
            .field("legacy_thunks", &self.inner.legacy_thunks)
            .finish()
    }
}
