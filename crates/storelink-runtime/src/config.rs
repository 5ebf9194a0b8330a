#![forbid(unsafe_code)]

//! Connector configuration.
//!
//! [`ConnectConfig`] holds the few policy decisions the engine leaves open:
//! which binding wins when a property is produced twice, whether legacy
//! zero-parameter thunks are run by the dispatcher, and the name of the
//! event emitted after each store notification.
//!
//! With the `policy-config` feature the configuration can be loaded from a
//! TOML or JSON document. Missing keys keep their defaults.
//!
//! ```toml
//! double_binding = "prefer_mapped"
//! legacy_thunks = false
//! state_changed_event = "store-updated"
//! ```

use storelink_core::{BindingSource, ConfigError};

/// Which binding wins when a property is fed both by a state path and by
/// `map_state_to_props`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum DoubleBindingPolicy {
    /// The descriptor's state path wins.
    #[default]
    PreferStatePath,
    /// The mapped value wins.
    PreferMapped,
}

impl DoubleBindingPolicy {
    /// Source whose value is kept on a collision.
    #[must_use]
    pub const fn winner(self) -> BindingSource {
        match self {
            Self::PreferStatePath => BindingSource::StatePath,
            Self::PreferMapped => BindingSource::MappedState,
        }
    }
}

/// Default name of the event emitted after each store notification.
pub const DEFAULT_STATE_CHANGED_EVENT: &str = "state-changed";

/// Policy for a [`Connector`](crate::Connector).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ConnectConfig {
    /// Winner when a property is both path-bound and mapped.
    pub double_binding: DoubleBindingPolicy,
    /// Run zero-parameter thunks immediately and dispatch their result.
    pub legacy_thunks: bool,
    /// Event emitted after each store notification; must not be blank.
    pub state_changed_event: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            double_binding: DoubleBindingPolicy::default(),
            legacy_thunks: true,
            state_changed_event: DEFAULT_STATE_CHANGED_EVENT.to_owned(),
        }
    }
}

impl ConnectConfig {
    /// The default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`double_binding`](Self::double_binding).
    #[must_use]
    pub fn double_binding(mut self, policy: DoubleBindingPolicy) -> Self {
        self.double_binding = policy;
        self
    }

    /// Set [`legacy_thunks`](Self::legacy_thunks).
    #[must_use]
    pub fn legacy_thunks(mut self, enabled: bool) -> Self {
        self.legacy_thunks = enabled;
        self
    }

    /// Set [`state_changed_event`](Self::state_changed_event).
    #[must_use]
    pub fn state_changed_event(mut self, name: impl Into<String>) -> Self {
        self.state_changed_event = name.into();
        self
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_changed_event.trim().is_empty() {
            return Err(ConfigError::InvalidPolicy(
                "state_changed_event must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML policy document.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(input).map_err(|err| ConfigError::InvalidPolicy(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON policy document.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|err| ConfigError::InvalidPolicy(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
