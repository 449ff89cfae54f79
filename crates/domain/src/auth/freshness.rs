//! Token freshness and supplier state classification.

/// Lookahead window before expiry at which a token is due for refresh.
pub const SAFETY_MARGIN_MS: i64 = 5 * 60 * 1000;

/// How a present record compares to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFreshness {
    /// Expiry lies beyond the safety margin.
    Valid,
    /// Expiry is within the safety margin or already past.
    ExpiringSoon,
}

/// Observable state of the token supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplierState {
    /// No usable record in cache or store.
    Absent,
    /// The cached access token can be served as is.
    Valid,
    /// The cached access token is due for refresh.
    ExpiringSoon,
    /// A refresh is in flight.
    Refreshing,
}

impl SupplierState {
    /// Get a user-friendly display message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Absent => "Not authenticated",
            Self::Valid => "Valid",
            Self::ExpiringSoon => "Expiring (will refresh on next request)",
            Self::Refreshing => "Refreshing",
        }
    }
}

impl From<TokenFreshness> for SupplierState {
    fn from(freshness: TokenFreshness) -> Self {
        match freshness {
            TokenFreshness::Valid => Self::Valid,
            TokenFreshness::ExpiringSoon => Self::ExpiringSoon,
        }
    }
}
