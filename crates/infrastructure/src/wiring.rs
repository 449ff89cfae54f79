//! Assembles the token lifecycle from the concrete adapters.

use std::sync::Arc;

use tokenwarden_application::{AuthGate, Clock, TokenStore, TokenSupplier};
use tokenwarden_domain::ClientSettings;
use tracing::debug;

use crate::adapters::SystemClock;
use crate::auth::ReqwestRefreshClient;
use crate::config::{ConfigError, resolve_token_path};
use crate::persistence::FileTokenStore;

/// Build a gate backed by the token file, the provider endpoint and the
/// system clock.
///
/// # Errors
/// Returns an error if no token path can be resolved or the HTTP client
/// cannot be built.
pub fn build_auth_gate(settings: &ClientSettings) -> Result<AuthGate, ConfigError> {
    let path = resolve_token_path(settings)?;
    debug!(path = %path.display(), endpoint = %settings.token_endpoint, "wiring token lifecycle");

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::at(path));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let refresher = ReqwestRefreshClient::new(settings.clone(), store.clone(), clock.clone())?;
    let supplier = TokenSupplier::new(store, Arc::new(refresher), clock);

    Ok(AuthGate::new(Arc::new(supplier)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokenwarden_application::AuthenticationRequired;
    use url::Url;

    #[tokio::test]
    async fn test_gate_over_empty_directory_requires_authentication() {
        let dir = TempDir::new().unwrap();
        let settings = ClientSettings::new(
            "c",
            "s",
            Url::parse("http://127.0.0.1:9/oauth/token").unwrap(),
        )
        .with_token_path(dir.path().join("token.json"));

        let gate = build_auth_gate(&settings).unwrap();

        assert_eq!(
            gate.ensure_authenticated(false).await,
            Err(AuthenticationRequired)
        );
    }

    #[tokio::test]
    async fn test_seeded_token_is_served_without_network() {
        let dir = TempDir::new().unwrap();
        let settings = ClientSettings::new(
            "c",
            "s",
            Url::parse("http://127.0.0.1:9/oauth/token").unwrap(),
        )
        .with_token_path(dir.path().join("token.json"));
        let gate = build_auth_gate(&settings).unwrap();

        let record = gate.supplier().seed_synthetic().await.unwrap();

        assert_eq!(
            gate.ensure_authenticated(false).await,
            Ok(record.access_token)
        );
        assert!(dir.path().join("token.json").exists());
    }
}
