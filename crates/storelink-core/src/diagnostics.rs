#![forbid(unsafe_code)]

//! Non-fatal diagnostics.
//!
//! Some declarations are legal but suspicious: a store-derived property that
//! also notifies upward, or a property fed both by a state path and by a
//! state mapping function. The engine reports these as [`Diagnostic`] values
//! through an injected [`DiagnosticSink`] and carries on.
//!
//! Sinks:
//!
//! - [`TracingSink`]: logs each diagnostic at `warn` level (the default).
//! - [`CollectingSink`]: records diagnostics for inspection in tests.
//! - [`NullSink`]: drops everything.

use std::cell::RefCell;
use std::fmt;

/// Which declaration supplied a property value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingSource {
    /// A `state_path` declared on the property descriptor.
    StatePath,
    /// The component's `map_state_to_props` function.
    MappedState,
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatePath => f.write_str("statePath"),
            Self::MappedState => f.write_str("mapStateToProps"),
        }
    }
}

/// A non-fatal warning raised while binding or updating a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A writable store-derived property has `notify` enabled.
    TwoWayBinding { component: String, property: String },
    /// A property is produced by both a state path and the state mapping.
    DoubleBinding {
        component: String,
        property: String,
        winner: BindingSource,
    },
    /// One property failed to update; the others were still applied.
    PropertyUpdateFailed {
        component: String,
        property: String,
        reason: String,
    },
    /// A mapped event listener returned an error.
    ListenerFailed {
        component: String,
        event: String,
        reason: String,
    },
    /// A store notification arrived while the element was borrowed outside
    /// of an update, or updates kept re-triggering notifications past the
    /// resync limit.
    ReentrantNotification { component: String },
    /// Event listeners could not be removed because the element was borrowed;
    /// removal is retried on the registry's next bind or unbind.
    TeardownDeferred { component: String },
}

impl Diagnostic {
    /// Component tag the diagnostic concerns.
    #[must_use]
    pub fn component(&self) -> &str {
        match self {
            Self::TwoWayBinding { component, .. }
            | Self::DoubleBinding { component, .. }
            | Self::PropertyUpdateFailed { component, .. }
            | Self::ListenerFailed { component, .. }
            | Self::ReentrantNotification { component }
            | Self::TeardownDeferred { component } => component,
        }
    }

    /// Property name, when the diagnostic concerns a single property.
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::TwoWayBinding { property, .. }
            | Self::DoubleBinding { property, .. }
            | Self::PropertyUpdateFailed { property, .. } => Some(property),
            Self::ListenerFailed { .. }
            | Self::ReentrantNotification { .. }
            | Self::TeardownDeferred { .. } => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoWayBinding {
                component,
                property,
            } => write!(
                f,
                "<{component}>.{property} has \"notify\" enabled, two-way bindings go against one-directional data flow"
            ),
            Self::DoubleBinding {
                component,
                property,
                winner,
            } => write!(
                f,
                "<{component}>.{property} has double bindings, {winner} binding has priority"
            ),
            Self::PropertyUpdateFailed {
                component,
                property,
                reason,
            } => write!(f, "<{component}>.{property} was not updated: {reason}"),
            Self::ListenerFailed {
                component,
                event,
                reason,
            } => write!(f, "<{component}> listener for \"{event}\" failed: {reason}"),
            Self::ReentrantNotification { component } => write!(
                f,
                "<{component}> received a store notification while borrowed; skipped"
            ),
            Self::TeardownDeferred { component } => write!(
                f,
                "<{component}> was borrowed during teardown; listener removal deferred"
            ),
        }
    }
}

/// Receiver for diagnostics.
pub trait DiagnosticSink {
    /// Report one diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs diagnostics through `tracing` at `warn` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            target: "storelink",
            component = diagnostic.component(),
            property = diagnostic.property().unwrap_or(""),
            "{diagnostic}"
        );
    }
}

/// Drops every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Records diagnostics in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    seen: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics reported so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.seen.borrow().clone()
    }

    /// Number of diagnostics reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    /// Whether nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.borrow().is_empty()
    }

    /// Drain and return everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.seen.borrow_mut())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.seen.borrow_mut().push(diagnostic);
    }
}
