//! YAML settings file.
//!
//! ```yaml
//! client_id: my-client
//! client_secret: s3cret
//! token_endpoint: https://auth.example.com/oauth/token
//! scopes: [read, write, offline_access]
//! request_timeout_secs: 30
//! token_path: /var/lib/tokenwarden/token.json
//! ```

use std::path::{Path, PathBuf};

use tokenwarden_domain::{ClientSettings, DomainError};

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Settings file location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid YAML for [`ClientSettings`].
    #[error("cannot parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The settings parsed but are unusable.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// No token path was configured and the platform has no config directory.
    #[error("no token path configured and no platform config directory")]
    NoTokenPath,

    /// The HTTP client could not be built.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Read settings from a YAML file without validating them, so callers can
/// apply overrides first.
///
/// # Errors
/// Returns an error if the file is unreadable or malformed.
pub async fn read_settings(path: &Path) -> Result<ClientSettings, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_yaml::from_str(&text)?)
}

/// Read and validate settings from a YAML file.
///
/// # Errors
/// Returns an error if the file is unreadable, malformed, or fails validation.
pub async fn load_settings(path: &Path) -> Result<ClientSettings, ConfigError> {
    let settings = read_settings(path).await?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
fn parse_settings(text: &str) -> Result<ClientSettings, ConfigError> {
    let settings: ClientSettings = serde_yaml::from_str(text)?;
    settings.validate()?;
    Ok(settings)
}

/// Platform default location of the token file.
#[must_use]
pub fn default_token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tokenwarden").join("token.json"))
}

/// The configured token path, or the platform default.
///
/// # Errors
/// Returns [`ConfigError::NoTokenPath`] if neither is available.
pub fn resolve_token_path(settings: &ClientSettings) -> Result<PathBuf, ConfigError> {
    settings
        .token_path
        .clone()
        .or_else(default_token_path)
        .ok_or(ConfigError::NoTokenPath)
}
