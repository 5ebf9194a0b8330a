#![forbid(unsafe_code)]

//! Core primitives for storelink.
//!
//! This crate holds the host-independent pieces of the binding engine:
//!
//! - [`path`]: resolve dotted or segmented paths against a state snapshot.
//! - [`layers`]: flatten ordered declaration layers, most-derived first.
//! - [`splice`]: compute index-based insert/remove edits between two sequences.
//! - [`diagnostics`]: non-fatal warnings and the sinks that receive them.
//! - [`error`]: the error taxonomy shared by every storelink crate.
//!
//! State snapshots are plain [`serde_json::Value`] trees and are never
//! mutated in place.

pub mod diagnostics;
pub mod error;
pub mod layers;
pub mod path;
pub mod splice;

pub use diagnostics::{
    BindingSource, CollectingSink, Diagnostic, DiagnosticSink, NullSink, TracingSink,
};
pub use error::{ConfigError, Error, Result, UnknownReason};
pub use layers::flatten;
pub use path::{StatePath, resolve, resolve_owned};
pub use splice::{Splice, apply_splices, calculate_splices};

/// A full state snapshot as delivered by a store.
pub type StateSnapshot = serde_json::Value;
