//! In-memory holder of the current token record.
//!
//! The cache is a read-through / write-through view of the token store: it is
//! filled from the store on first use and updated after every durable write.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokenwarden_domain::{DomainResult, TokenRecord};

/// Thread-safe single-slot token cache.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    slot: Arc<RwLock<Option<TokenRecord>>>,
}

impl TokenCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached record, if any.
    pub async fn get(&self) -> Option<TokenRecord> {
        let slot = self.slot.read().await;
        slot.clone()
    }

    /// Replace the cached record.
    ///
    /// # Errors
    /// Returns an error, leaving the cache untouched, if the record has an
    /// empty access or refresh token.
    pub async fn set(&self, record: TokenRecord) -> DomainResult<()> {
        record.validate()?;
        let mut slot = self.slot.write().await;
        *slot = Some(record);
        Ok(())
    }

    /// Returns true if nothing has been cached yet.
    pub async fn is_empty(&self) -> bool {
        let slot = self.slot.read().await;
        slot.is_none()
    }
}
