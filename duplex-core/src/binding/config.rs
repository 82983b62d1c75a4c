//! Binding configuration.

use serde::{Deserialize, Serialize};

use crate::error::{BindError, Result};

/// Direction and enablement of a binder.
///
/// Changing either field on a live binder is never a partial transition:
/// the binder unbinds everything, applies the new value, then binds again
/// if binding is enabled.
///
/// Missing fields take their defaults when deserialized, so `{}` is a valid
/// configuration (one-way, enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Propagate target changes back to the source.
    pub bidirectional: bool,

    /// Whether bindings are attached at all.
    pub enabled: bool,
}

impl BindingConfig {
    /// One-way, enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the direction.
    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    /// Set enablement.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| BindError::InvalidConfig(err.to_string()))
    }

    /// Render the configuration as JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| BindError::InvalidConfig(err.to_string()))
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            bidirectional: false,
            enabled: true,
        }
    }
}
