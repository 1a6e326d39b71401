//! Engine configuration.
//!
//! Loaded from YAML. The file path can be overridden with the
//! `APGOV_RECONCILE_CONFIG` environment variable.

use std::path::Path;
use std::time::Duration;

use apgov_connector::types::AccessProviderState;
use apgov_connector::ClientSettings;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "APGOV_RECONCILE_CONFIG";

/// How a declared identity-store set that names the native store is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeLinkPolicy {
    /// Accept the declaration and leave the native link alone.
    #[default]
    Ignore,
    /// Fail validation.
    Reject,
}

/// Reconciliation engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Settings of the remote client.
    #[serde(default)]
    pub client: ClientSettings,

    /// Upper bound for draining one listing during a pass, in seconds.
    #[serde(default = "default_list_deadline")]
    pub list_deadline_secs: u64,

    /// Skip the update call when the payload matches the remote state.
    #[serde(default = "default_skip_unchanged_updates")]
    pub skip_unchanged_updates: bool,

    /// State used when a declaration leaves `state` empty.
    #[serde(default)]
    pub default_created_state: AccessProviderState,

    #[serde(default)]
    pub native_identity_store_policy: NativeLinkPolicy,
}

fn default_list_deadline() -> u64 {
    300
}

fn default_skip_unchanged_updates() -> bool {
    true
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            list_deadline_secs: default_list_deadline(),
            skip_unchanged_updates: default_skip_unchanged_updates(),
            default_created_state: AccessProviderState::Active,
            native_identity_store_policy: NativeLinkPolicy::Ignore,
        }
    }
}

impl ReconcileConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ReconcileResult<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ReconcileError::Configuration {
                message: format!(
                    "failed to read config file {}: {e}",
                    path.as_ref().display()
                ),
            })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> ReconcileResult<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ReconcileError::Configuration {
                message: format!("failed to parse config: {e}"),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `APGOV_RECONCILE_CONFIG`, or fall back to defaults.
    pub fn load() -> ReconcileResult<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn with_list_deadline(mut self, secs: u64) -> Self {
        self.list_deadline_secs = secs;
        self
    }

    #[must_use]
    pub fn with_skip_unchanged_updates(mut self, skip: bool) -> Self {
        self.skip_unchanged_updates = skip;
        self
    }

    #[must_use]
    pub fn with_default_created_state(mut self, state: AccessProviderState) -> Self {
        self.default_created_state = state;
        self
    }

    #[must_use]
    pub fn with_native_identity_store_policy(mut self, policy: NativeLinkPolicy) -> Self {
        self.native_identity_store_policy = policy;
        self
    }

    pub fn list_deadline(&self) -> Duration {
        Duration::from_secs(self.list_deadline_secs)
    }

    pub fn validate(&self) -> ReconcileResult<()> {
        self.client
            .validate()
            .map_err(|e| ReconcileError::Configuration {
                message: e.to_string(),
            })?;
        if self.list_deadline_secs == 0 {
            return Err(ReconcileError::Configuration {
                message: "list_deadline_secs must be at least 1".to_string(),
            });
        }
        if !self.default_created_state.is_settable() {
            return Err(ReconcileError::Configuration {
                message: format!(
                    "default_created_state must be Active or Inactive, got {}",
                    self.default_created_state
                ),
            });
        }
        Ok(())
    }
}
