//! Application error types

use std::sync::Arc;

use thiserror::Error;

use crate::ports::RefreshError;

/// Why the supplier could not hand out an access token.
#[derive(Debug, Clone, Error)]
pub enum SupplyError {
    /// Neither the cache nor the store holds a usable record.
    #[error("no usable token record")]
    NotAuthenticated,

    /// The refresh every concurrent caller waited on failed.
    #[error("token refresh failed: {0}")]
    Refresh(Arc<RefreshError>),
}

/// Result type alias for supplier operations.
pub type SupplyResult<T> = Result<T, SupplyError>;

/// The single error callers of the gate see: an interactive login must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication required")]
pub struct AuthenticationRequired;
