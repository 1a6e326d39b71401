//! Client settings
//!
//! Connection and paging settings shared by every transport. Settings are
//! plain serde structs so they can be embedded in the engine's YAML
//! configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Settings for talking to the governance service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL of the governance API.
    #[serde(default = "default_url")]
    pub url: String,

    /// Timeout for a single request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound for draining one listing, in seconds.
    #[serde(default = "default_list_deadline")]
    pub list_deadline_secs: u64,

    /// Number of items requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_url() -> String {
    "https://api.raito.cloud".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_list_deadline() -> u64 {
    300
}

fn default_page_size() -> usize {
    50
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            request_timeout_secs: default_request_timeout(),
            list_deadline_secs: default_list_deadline(),
            page_size: default_page_size(),
        }
    }
}

impl ClientSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the listing deadline.
    pub fn with_list_deadline(mut self, secs: u64) -> Self {
        self.list_deadline_secs = secs;
        self
    }

    /// Get the request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the listing deadline as Duration.
    pub fn list_deadline(&self) -> Duration {
        Duration::from_secs(self.list_deadline_secs)
    }

    /// Validate the settings.
    pub fn validate(&self) -> ConnectorResult<()> {
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(ConnectorError::InvalidConfiguration {
                message: format!("url must be http(s), got '{}'", self.url),
            });
        }
        if self.page_size == 0 {
            return Err(ConnectorError::InvalidConfiguration {
                message: "page_size must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 || self.list_deadline_secs == 0 {
            return Err(ConnectorError::InvalidConfiguration {
                message: "timeouts must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}
