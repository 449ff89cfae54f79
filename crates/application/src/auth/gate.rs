//! Authentication gate consumed by request handlers.
//!
//! The gate collapses every internal failure into [`AuthenticationRequired`]:
//! callers only learn that an interactive login has to run. The detail goes to
//! the tracing subscriber.

use std::sync::Arc;

use tracing::{debug, warn};

use super::TokenSupplier;
use crate::error::AuthenticationRequired;

/// Public entry point for obtaining an access token.
#[derive(Clone)]
pub struct AuthGate {
    supplier: Arc<TokenSupplier>,
}

impl AuthGate {
    /// Create a gate in front of `supplier`.
    #[must_use]
    pub const fn new(supplier: Arc<TokenSupplier>) -> Self {
        Self { supplier }
    }

    /// The supplier behind this gate.
    #[must_use]
    pub fn supplier(&self) -> &TokenSupplier {
        &self.supplier
    }

    /// Get an access token the caller can use right now.
    ///
    /// # Arguments
    /// * `force_new` - The caller wants a fresh interactive login; cached and
    ///   refreshable credentials are ignored.
    ///
    /// # Errors
    /// Returns [`AuthenticationRequired`] when `force_new` is set or when no
    /// token can be supplied for any reason.
    pub async fn ensure_authenticated(
        &self,
        force_new: bool,
    ) -> Result<String, AuthenticationRequired> {
        if force_new {
            debug!("fresh login requested; skipping stored credentials");
            return Err(AuthenticationRequired);
        }

        self.supplier.access_token().await.map_err(|error| {
            warn!(%error, "no access token available; authentication required");
            AuthenticationRequired
        })
    }
}
