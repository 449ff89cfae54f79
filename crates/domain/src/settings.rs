//! Client settings domain model
//!
//! Defines the opaque configuration the refresh grant needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{DomainError, DomainResult};

const fn default_request_timeout_secs() -> u64 {
    30
}

/// Settings for talking to the provider's token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Location of the persisted token file. Falls back to a platform default
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Scopes requested on refresh.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Provider token endpoint.
    pub token_endpoint: Url,
    /// Upper bound for a single refresh round trip.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ClientSettings {
    /// Create settings with the default timeout and no explicit token path.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_endpoint: Url,
    ) -> Self {
        Self {
            token_path: None,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: Vec::new(),
            token_endpoint,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the token file location.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    /// The `scope` form parameter: configured scopes joined by spaces.
    #[must_use]
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    /// The transport timeout for a refresh request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the settings are usable for a refresh grant.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidSettings`] describing the first problem.
    pub fn validate(&self) -> DomainResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(DomainError::InvalidSettings("client_id is empty".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(DomainError::InvalidSettings(
                "client_secret is empty".to_string(),
            ));
        }
        if !matches!(self.token_endpoint.scheme(), "http" | "https") {
            return Err(DomainError::InvalidSettings(format!(
                "token_endpoint must be http(s), got {}",
                self.token_endpoint.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(DomainError::InvalidSettings(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("token_path", &self.token_path)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
