//! Transport configuration for the REST client

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the underlying HTTP client
///
/// Nothing here is read from files or the environment; callers build it
/// directly or deserialize it from their own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout; `None` keeps the HTTP client's default
    pub timeout: Option<Duration>,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: format!("ha-rest-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
