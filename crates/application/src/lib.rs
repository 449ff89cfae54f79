//! Tokenwarden Application - Token lifecycle and ports
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for persistence, the token endpoint and time)
//! - The token cache and refresh state machine
//! - The authentication gate consumed by request handlers

pub mod auth;
pub mod error;
pub mod ports;

pub use auth::{AuthGate, TokenCache, TokenSupplier, write_synthetic_token};
pub use error::{AuthenticationRequired, SupplyError, SupplyResult};
pub use ports::{Clock, RefreshClient, RefreshError, StoreError, TokenStore};
