//! The persisted token record and the provider grant it is built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::freshness::{SAFETY_MARGIN_MS, TokenFreshness};
use crate::error::{DomainError, DomainResult};

/// Lifetime of a synthetic record produced for tests and demos (one hour).
pub const SYNTHETIC_LIFETIME_MS: i64 = 60 * 60 * 1000;

/// The durable unit of credential state.
///
/// A record is only ever replaced wholesale. The persisted JSON carries the
/// three credential fields plus whatever metadata the provider returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Long-lived credential exchanged for new access tokens.
    pub refresh_token: String,
    /// Epoch milliseconds after which `access_token` must not be used.
    pub expires_at: i64,
    /// Space-separated scopes granted by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Token type reported by the provider (usually "Bearer").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Any other provider fields, carried through unchanged.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl TokenRecord {
    /// Create a record with no provider metadata.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            scope: None,
            token_type: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Fabricate a record with placeholder credentials that expires one hour
    /// after `now_ms`.
    #[must_use]
    pub fn synthetic(now_ms: i64) -> Self {
        Self {
            token_type: Some("Bearer".to_string()),
            ..Self::new(
                format!("synthetic-access-{now_ms}"),
                format!("synthetic-refresh-{now_ms}"),
                now_ms + SYNTHETIC_LIFETIME_MS,
            )
        }
    }

    /// Build the successor of `previous` from a refresh grant received at
    /// `now_ms`.
    ///
    /// The expiry is always derived from `expires_in`. When the provider omits
    /// the refresh token (or sends an empty one) the previous one is kept.
    /// Omitted scope and token type fall back to the previous values, and
    /// metadata is the previous record's overlaid with the grant's fields.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRecord`] if the grant carries an empty
    /// access token.
    pub fn from_grant(grant: TokenGrant, previous: &Self, now_ms: i64) -> DomainResult<Self> {
        if grant.access_token.is_empty() {
            return Err(DomainError::InvalidRecord(
                "grant carries an empty access_token".to_string(),
            ));
        }

        let lifetime_ms = i64::try_from(grant.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let refresh_token = grant
            .refresh_token
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| previous.refresh_token.clone());

        let mut metadata = previous.metadata.clone();
        metadata.extend(grant.extra);

        Ok(Self {
            access_token: grant.access_token,
            refresh_token,
            expires_at: now_ms.saturating_add(lifetime_ms),
            scope: grant.scope.or_else(|| previous.scope.clone()),
            token_type: grant.token_type.or_else(|| previous.token_type.clone()),
            metadata,
        })
    }

    /// Check the structural invariants every cached or persisted record holds.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRecord`] naming the empty credential.
    pub fn validate(&self) -> DomainResult<()> {
        if self.access_token.is_empty() {
            return Err(DomainError::InvalidRecord("access_token is empty".to_string()));
        }
        if self.refresh_token.is_empty() {
            return Err(DomainError::InvalidRecord("refresh_token is empty".to_string()));
        }
        Ok(())
    }

    /// Classify the record against `now_ms` using the fixed safety margin.
    ///
    /// A record is only `Valid` while its expiry lies strictly more than the
    /// margin ahead.
    #[must_use]
    pub const fn freshness_at(&self, now_ms: i64) -> TokenFreshness {
        if self.expires_at.saturating_sub(now_ms) > SAFETY_MARGIN_MS {
            TokenFreshness::Valid
        } else {
            TokenFreshness::ExpiringSoon
        }
    }

    /// A log-safe preview of the access token (first 8 chars + ...).
    #[must_use]
    pub fn access_preview(&self) -> String {
        preview(&self.access_token)
    }
}

fn preview(token: &str) -> String {
    if token.chars().count() > 12 {
        let head: String = token.chars().take(8).collect();
        format!("{head}...")
    } else {
        "***".to_string()
    }
}

/// Successful response body of the provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// Declared lifetime of `access_token` in seconds.
    pub expires_in: u64,
    /// Rotated refresh token, if the provider issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Token type.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Remaining provider fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
