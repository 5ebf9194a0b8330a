#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! | Error | When | Scope |
//! |-------|------|-------|
//! | [`ConfigError`] | Building a connector or loading a policy | Fatal to construction |
//! | [`Error::UnknownActionCreator`] | Dispatch by name finds nothing invocable | Fatal to that dispatch |
//! | [`Error::ArrayTypeMismatch`] | Array property receives a non-array value | Fatal to that property update only |
//! | [`Error::Rejected`] | The store refuses an action | Fatal to that dispatch |
//!
//! Non-fatal conditions are [`Diagnostic`](crate::diagnostics::Diagnostic)s,
//! not errors.

use std::fmt;

use thiserror::Error;

/// Result alias used across storelink.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Problems detected while constructing a connector or loading its policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No store was supplied.
    #[error("storelink: expecting a store")]
    MissingStore,
    /// The store lacks a required operation.
    #[error("storelink: invalid store, missing `{capability}`")]
    MissingCapability { capability: &'static str },
    /// A policy document could not be parsed or failed validation.
    #[error("storelink: invalid policy: {0}")]
    InvalidPolicy(String),
}

/// Why a named action creator could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// No layer declares the name.
    Missing,
    /// The name is declared but not invocable.
    NotInvocable,
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("has no action creator"),
            Self::NotInvocable => f.write_str("has an invalid action creator"),
        }
    }
}

/// Errors raised by binding and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Construction-time configuration problem.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    /// Dispatch by name found no invocable action creator.
    #[error("storelink: <{component}> {reason} \"{action}\"")]
    UnknownActionCreator {
        component: String,
        action: String,
        reason: UnknownReason,
    },
    /// An array-typed property received a value that is not an array.
    #[error("storelink: <{component}>.{property} type is Array but given: {found}")]
    ArrayTypeMismatch {
        component: String,
        property: String,
        found: &'static str,
    },
    /// The store refused the action.
    #[error("storelink: store rejected action: {reason}")]
    Rejected { reason: String },
}

impl Error {
    /// Whether this error only affects a single property update.
    #[must_use]
    pub fn is_property_scoped(&self) -> bool {
        matches!(self, Self::ArrayTypeMismatch { .. })
    }
}

/// JSON type name of `value`, for error messages.
#[must_use]
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
