//! Synthetic credentials for exercising callers without a real provider.

use tokenwarden_domain::TokenRecord;
use tracing::info;

use super::TokenSupplier;
use crate::ports::{Clock, StoreError, TokenStore};

/// Fabricate a record valid for one hour and persist it.
///
/// # Errors
/// Returns an error if the record cannot be saved.
pub async fn write_synthetic_token(
    store: &dyn TokenStore,
    clock: &dyn Clock,
) -> Result<TokenRecord, StoreError> {
    let record = TokenRecord::synthetic(clock.now_millis());
    store.save(&record).await?;
    info!(expires_at = record.expires_at, "wrote synthetic token record");
    Ok(record)
}

impl TokenSupplier {
    /// Fabricate a record valid for one hour and make it current.
    ///
    /// # Errors
    /// Returns an error if the record cannot be saved.
    pub async fn seed_synthetic(&self) -> Result<TokenRecord, StoreError> {
        let record = TokenRecord::synthetic(self.clock().now_millis());
        self.install(record.clone()).await?;
        Ok(record)
    }
}
