//! Configuration structures for AppEngine clients.
//!
//! The configuration is a plain value owned by the caller and handed to a client builder;
//! there is no process-wide default instance.

use crate::client::APPENGINE_DEFAULT_TIMEOUT;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Default number of devices requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Upper bound accepted for the page size.
pub const MAX_PAGE_SIZE: u32 = 100_000;

/// Configuration for an AppEngine client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppEngineConfig {
    /// AppEngine API base URL
    #[validate(url)]
    pub appengine_url: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of devices requested per page when listing
    #[validate(range(min = 1, max = MAX_PAGE_SIZE))]
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Optional User-Agent override
    #[validate(length(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

const fn default_request_timeout_secs() -> u64 {
    APPENGINE_DEFAULT_TIMEOUT
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl AppEngineConfig {
    /// Create a new client configuration.
    ///
    /// # Arguments
    ///
    /// * `appengine_url` - The base URL for AppEngine (e.g., "https://api.astarte.example.com/appengine")
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(appengine_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            appengine_url: appengine_url.into(),
            request_timeout_secs: default_request_timeout_secs(),
            page_size: default_page_size(),
            user_agent: None,
        };

        config.check()?;
        Ok(config)
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the default listing page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the User-Agent header sent with every request.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Run validation, e.g. after deserializing or applying setters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] describing the offending fields.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        Ok(())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppEngineConfig {
    fn default() -> Self {
        Self {
            appengine_url: "http://localhost:4002".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            page_size: default_page_size(),
            user_agent: None,
        }
    }
}
