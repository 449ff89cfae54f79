//! Refresh client port
//!
//! Defines the interface to the provider's refresh-token grant.

use async_trait::async_trait;
use tokenwarden_domain::TokenRecord;

use super::StoreError;

/// Ways a refresh attempt can fail.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The current record carries no refresh token; nothing was sent.
    #[error("no refresh token on record")]
    NoRefreshToken,

    /// The provider answered with a non-success status.
    #[error("token endpoint returned {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request could not be built; nothing was sent.
    #[error("cannot build refresh request: {0}")]
    InvalidRequest(String),

    /// No response was received (connect failure, timeout).
    #[error("token endpoint unreachable: {0}")]
    Network(String),

    /// The provider answered with success but the body is not a usable grant.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// The refreshed record could not be persisted.
    #[error("refreshed token could not be saved: {0}")]
    SaveFailed(#[from] StoreError),

    /// The refresh task stopped before producing an outcome.
    #[error("refresh aborted: {0}")]
    Aborted(String),
}

/// Executes the OAuth2 refresh-token grant.
#[async_trait]
pub trait RefreshClient: Send + Sync {
    /// Exchange `current.refresh_token` for a new record.
    ///
    /// A refresh only succeeds once the new record has been saved to the
    /// token store. The returned record carries the previous refresh token
    /// when the provider did not rotate it.
    ///
    /// # Errors
    /// See [`RefreshError`]. Nothing is retried.
    async fn refresh(&self, current: &TokenRecord) -> Result<TokenRecord, RefreshError>;
}
