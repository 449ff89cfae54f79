//! `OAuth2` refresh-token grant over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokenwarden_application::{Clock, RefreshClient, RefreshError, TokenStore};
use tokenwarden_domain::{ClientSettings, TokenGrant, TokenRecord};
use tracing::{debug, info, warn};

/// Content-Type for form-urlencoded data.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Refresh client backed by `reqwest`.
///
/// Every call is a single POST to the configured token endpoint. Responses are
/// persisted through the token store before the new record is returned.
pub struct ReqwestRefreshClient {
    http_client: reqwest::Client,
    settings: ClientSettings,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl ReqwestRefreshClient {
    /// Create a client for `settings` that saves into `store`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        settings: ClientSettings,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            settings,
            store,
            clock,
        })
    }

    fn form_body(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let scope = self.settings.scope_param();
        let params = [
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("scope", scope.as_str()),
        ];

        serde_urlencoded::to_string(params)
            .map_err(|e| RefreshError::InvalidRequest(format!("failed to encode form: {e}")))
    }
}

#[async_trait]
impl RefreshClient for ReqwestRefreshClient {
    async fn refresh(&self, current: &TokenRecord) -> Result<TokenRecord, RefreshError> {
        if current.refresh_token.is_empty() {
            return Err(RefreshError::NoRefreshToken);
        }

        let body = self.form_body(&current.refresh_token)?;
        debug!(endpoint = %self.settings.token_endpoint, "requesting token refresh");

        let response = self
            .http_client
            .post(self.settings.token_endpoint.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token endpoint rejected refresh");
            return Err(RefreshError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;
        let grant: TokenGrant = serde_json::from_str(&text)
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;

        let record = TokenRecord::from_grant(grant, current, self.clock.now_millis())
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
        self.store.save(&record).await?;

        info!(
            access = %record.access_preview(),
            expires_at = record.expires_at,
            rotated = record.refresh_token != current.refresh_token,
            "access token refreshed"
        );
        Ok(record)
    }
}
