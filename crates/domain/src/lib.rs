//! Tokenwarden Domain - Core credential types
//!
//! This crate defines the domain model for the Tokenwarden token manager.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod settings;

pub use auth::{
    SAFETY_MARGIN_MS, SYNTHETIC_LIFETIME_MS, SupplierState, TokenFreshness, TokenGrant,
    TokenRecord,
};
pub use error::{DomainError, DomainResult};
pub use settings::ClientSettings;
