//! Token lifecycle for Tokenwarden.
//!
//! This module provides:
//! - The single-slot token cache
//! - The refresh state machine with single-flight refresh
//! - The authentication gate request handlers call
//! - A synthetic token fixture for exercising callers without a provider

mod cache;
mod fixture;
mod gate;
mod supplier;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test_support;

pub use cache::TokenCache;
pub use fixture::write_synthetic_token;
pub use gate::AuthGate;
pub use supplier::TokenSupplier;
