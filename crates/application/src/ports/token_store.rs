//! Token store port
//!
//! Defines the interface for durable token persistence.

use async_trait::async_trait;
use tokenwarden_domain::{DomainError, TokenRecord};

use super::FileSystemError;

/// Errors that can occur while saving a token record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] FileSystemError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The record violates the token invariants and was not written.
    #[error("Refusing to persist record: {0}")]
    InvalidRecord(#[from] DomainError),
}

/// Durable persistence of the single current token record.
///
/// Implementations carry no policy: they load and save whole records.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Loads the persisted record.
    ///
    /// # Returns
    /// The record, or `None` when nothing usable is stored. A missing file,
    /// an unreadable file and malformed content all count as `None`.
    async fn load(&self) -> Option<TokenRecord>;

    /// Replaces the persisted record.
    ///
    /// # Arguments
    /// * `record` - The full record to write
    ///
    /// # Errors
    /// Returns an error if the record cannot be written durably.
    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError>;
}
