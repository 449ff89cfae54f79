//! Credential domain types

mod freshness;
mod record;

pub use freshness::{SAFETY_MARGIN_MS, SupplierState, TokenFreshness};
pub use record::{SYNTHETIC_LIFETIME_MS, TokenGrant, TokenRecord};
