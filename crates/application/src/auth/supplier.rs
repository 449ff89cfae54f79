//! The token refresh state machine.
//!
//! A request for a token evaluates the current record against the clock:
//!
//! - no record (or only one whose refresh token was rejected): read the store,
//!   and if it has nothing new, report that authentication is required
//! - valid: hand out the cached access token
//! - expiring soon: join the in-flight refresh for that refresh token, or start
//!   one and publish its shared result for everyone who asks meanwhile
//!
//! A failed refresh marks the refresh token as rejected. The stale record stays
//! in the cache and on disk but is never served again, and the rejected token is
//! never sent to the provider a second time.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokenwarden_domain::{SupplierState, TokenFreshness, TokenRecord};
use tracing::{debug, info, warn};

use super::TokenCache;
use crate::error::{SupplyError, SupplyResult};
use crate::ports::{Clock, RefreshClient, RefreshError, StoreError, TokenStore};

type RefreshOutcome = Result<TokenRecord, Arc<RefreshError>>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    id: u64,
    refresh_token: String,
    pending: PendingRefresh,
}

#[derive(Default)]
struct Flight {
    in_flight: Option<InFlight>,
    rejected: Option<String>,
    next_id: u64,
    /// Bumped by every `install`; a refresh started under an older value is
    /// stale and must not overwrite the installed record.
    installs: u64,
}

impl Flight {
    fn is_rejected(&self, record: &TokenRecord) -> bool {
        self.rejected.as_deref() == Some(record.refresh_token.as_str())
    }

    fn finish(&mut self, id: u64) {
        if self.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
            self.in_flight = None;
        }
    }
}

/// Decides whether to serve, refresh, or give up on the current token.
pub struct TokenSupplier {
    cache: TokenCache,
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn RefreshClient>,
    clock: Arc<dyn Clock>,
    flight: Arc<Mutex<Flight>>,
}

impl TokenSupplier {
    /// Create a supplier with an empty cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn RefreshClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: TokenCache::new(),
            store,
            refresher,
            clock,
            flight: Arc::new(Mutex::new(Flight::default())),
        }
    }

    /// The cache owned by this supplier.
    #[must_use]
    pub const fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// The clock expiry decisions are made against.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Get a currently valid access token, refreshing it first if it is due.
    ///
    /// Concurrent callers that find the token due share one refresh and all
    /// receive its result.
    ///
    /// # Errors
    /// - [`SupplyError::NotAuthenticated`] when no usable record exists; no
    ///   network call is made
    /// - [`SupplyError::Refresh`] when the shared refresh failed
    pub async fn access_token(&self) -> SupplyResult<String> {
        let pending = {
            let mut flight = self.flight.lock().await;
            let Some(record) = self.current(&mut flight).await else {
                return Err(SupplyError::NotAuthenticated);
            };

            match record.freshness_at(self.clock.now_millis()) {
                TokenFreshness::Valid => return Ok(record.access_token),
                TokenFreshness::ExpiringSoon => self.join_or_start(&mut flight, record),
            }
        };

        match pending.await {
            Ok(record) => Ok(record.access_token),
            Err(cause) => Err(SupplyError::Refresh(cause)),
        }
    }

    /// Make `record` the current record, e.g. after an interactive login.
    ///
    /// The record is saved before it is cached, and any earlier rejection is
    /// forgotten.
    ///
    /// # Errors
    /// Returns an error if the record is invalid or cannot be saved; the
    /// cache is then left unchanged.
    pub async fn install(&self, record: TokenRecord) -> Result<(), StoreError> {
        record.validate()?;

        let mut flight = self.flight.lock().await;
        self.store.save(&record).await?;
        let preview = record.access_preview();
        self.cache.set(record).await?;
        flight.rejected = None;
        flight.installs += 1;

        info!(access = %preview, "installed token record");
        Ok(())
    }

    /// The current state and the record it was derived from.
    pub async fn snapshot(&self) -> (SupplierState, Option<TokenRecord>) {
        let mut flight = self.flight.lock().await;
        if flight.in_flight.is_some() {
            return (SupplierState::Refreshing, self.cache.get().await);
        }

        match self.current(&mut flight).await {
            Some(record) => {
                let state = record.freshness_at(self.clock.now_millis()).into();
                (state, Some(record))
            }
            None => (SupplierState::Absent, None),
        }
    }

    /// The current state.
    pub async fn state(&self) -> SupplierState {
        self.snapshot().await.0
    }

    /// Resolve the record decisions are made on: the cache, else the store.
    async fn current(&self, flight: &mut Flight) -> Option<TokenRecord> {
        if let Some(record) = self.cache.get().await
            && !flight.is_rejected(&record)
        {
            return Some(record);
        }

        let Some(loaded) = self.store.load().await else {
            debug!("token store holds no usable record");
            return None;
        };
        if flight.is_rejected(&loaded) {
            debug!("stored record carries a rejected refresh token");
            return None;
        }
        if let Err(error) = self.cache.set(loaded.clone()).await {
            debug!(%error, "stored record is not cacheable");
            return None;
        }

        flight.rejected = None;
        debug!(expires_at = loaded.expires_at, "loaded token record from store");
        Some(loaded)
    }

    fn join_or_start(&self, flight: &mut Flight, record: TokenRecord) -> PendingRefresh {
        if let Some(in_flight) = &flight.in_flight
            && in_flight.refresh_token == record.refresh_token
        {
            debug!("joining in-flight token refresh");
            return in_flight.pending.clone();
        }

        flight.next_id += 1;
        let id = flight.next_id;
        let refresh_token = record.refresh_token.clone();
        let pending = self.spawn_refresh(id, flight.installs, record);
        flight.in_flight = Some(InFlight {
            id,
            refresh_token,
            pending: pending.clone(),
        });
        pending
    }

    /// Run the refresh on its own task so it completes even if every waiter
    /// goes away.
    fn spawn_refresh(&self, id: u64, installs: u64, current: TokenRecord) -> PendingRefresh {
        let refresher = Arc::clone(&self.refresher);
        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();
        let flight = Arc::clone(&self.flight);

        debug!(access = %current.access_preview(), "starting token refresh");
        let task = tokio::spawn(async move {
            let refreshed = refresher.refresh(&current).await;

            let mut flight = flight.lock().await;
            if flight.installs != installs {
                flight.finish(id);
                return Self::keep_installed(&cache, store.as_ref())
                    .await
                    .map_err(Arc::new);
            }

            let outcome = match refreshed {
                Ok(next) => match cache.set(next.clone()).await {
                    Ok(()) => Ok(next),
                    Err(error) => Err(RefreshError::MalformedResponse(error.to_string())),
                },
                Err(error) => Err(error),
            };

            match &outcome {
                Ok(next) => {
                    info!(
                        access = %next.access_preview(),
                        expires_at = next.expires_at,
                        "token refreshed"
                    );
                }
                Err(error) => {
                    warn!(%error, "token refresh failed; record will not be served");
                    flight.rejected = Some(current.refresh_token.clone());
                }
            }
            flight.finish(id);

            outcome.map_err(Arc::new)
        });

        let flight = Arc::clone(&self.flight);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    flight.lock().await.finish(id);
                    Err(Arc::new(RefreshError::Aborted(join_error.to_string())))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// A record was installed while a refresh was running. The refresher may
    /// already have saved its result, so the installed record is written back
    /// and handed to the waiters instead.
    async fn keep_installed(
        cache: &TokenCache,
        store: &dyn TokenStore,
    ) -> Result<TokenRecord, RefreshError> {
        let Some(installed) = cache.get().await else {
            return Err(RefreshError::Aborted(
                "installed record missing from cache".to_string(),
            ));
        };
        store.save(&installed).await?;
        debug!(
            access = %installed.access_preview(),
            "discarding refresh result superseded by an installed record"
        );
        Ok(installed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::test_support::{FakeRefresher, MemoryStore, NOW, harness};
    use crate::ports::ManualClock;
    use pretty_assertions::assert_eq;
    use tokenwarden_domain::SAFETY_MARGIN_MS;

    #[tokio::test]
    async fn test_valid_token_served_from_cache() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW + 3_600_000));

        assert_eq!(supplier.access_token().await.unwrap(), "A1");
        assert_eq!(supplier.access_token().await.unwrap(), "A1");

        assert_eq!(store.load_count(), 1);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_absent_without_network_call() {
        let (store, refresher, _clock, supplier) = harness();

        let result = supplier.access_token().await;

        assert!(matches!(result, Err(SupplyError::NotAuthenticated)));
        assert_eq!(store.load_count(), 1);
        assert_eq!(refresher.calls(), 0);
        assert_eq!(supplier.state().await, SupplierState::Absent);
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed_and_cached() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW + SAFETY_MARGIN_MS - 1));
        refresher.succeed_with("A2", 3600, None);

        assert_eq!(supplier.access_token().await.unwrap(), "A2");
        assert_eq!(refresher.calls(), 1);
        assert_eq!(refresher.seen_refresh_tokens(), vec!["R1".to_string()]);

        let cached = supplier.cache().get().await.unwrap();
        assert_eq!(cached.refresh_token, "R1");
        assert_eq!(cached.expires_at, NOW + 3_600_000);
        assert_eq!(store.current(), Some(cached));

        assert_eq!(supplier.access_token().await.unwrap(), "A2");
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_flight_success() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW - 1000));
        refresher.succeed_with("A2", 3600, Some("R2"));
        refresher.hold();
        let supplier = Arc::new(supplier);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let supplier = Arc::clone(&supplier);
            handles.push(tokio::spawn(async move { supplier.access_token().await }));
        }
        while refresher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
        assert_eq!(supplier.state().await, SupplierState::Refreshing);

        refresher.release();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "A2");
        }

        assert_eq!(refresher.calls(), 1);
        assert_eq!(supplier.state().await, SupplierState::Valid);
        assert_eq!(store.current().unwrap().refresh_token, "R2");
    }

    #[tokio::test]
    async fn test_single_flight_failure_is_shared_and_not_retried() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW - 1000));
        refresher.fail_with_status(400, r#"{"error":"invalid_grant"}"#);
        refresher.hold();
        let supplier = Arc::new(supplier);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let supplier = Arc::clone(&supplier);
            handles.push(tokio::spawn(async move { supplier.access_token().await }));
        }
        while refresher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
        refresher.release();

        for handle in handles {
            match handle.await.unwrap() {
                Err(SupplyError::Refresh(cause)) => {
                    assert!(matches!(
                        cause.as_ref(),
                        RefreshError::Transport { status: 400, .. }
                    ));
                }
                other => panic!("expected shared refresh failure, got {other:?}"),
            }
        }
        assert_eq!(refresher.calls(), 1);

        // The stale record is kept but never served or retried.
        assert!(matches!(
            supplier.access_token().await,
            Err(SupplyError::NotAuthenticated)
        ));
        assert_eq!(refresher.calls(), 1);
        assert_eq!(supplier.state().await, SupplierState::Absent);
        assert_eq!(store.current().unwrap().access_token, "A1");
        assert_eq!(supplier.cache().get().await.unwrap().access_token, "A1");
    }

    #[tokio::test]
    async fn test_new_record_in_store_is_adopted_after_rejection() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW - 1000));
        refresher.fail_with_status(401, "denied");
        assert!(supplier.access_token().await.is_err());

        store.put(TokenRecord::new("B1", "S1", NOW + 3_600_000));

        assert_eq!(supplier.access_token().await.unwrap(), "B1");
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_install_replaces_rejected_record() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW - 1000));
        refresher.fail_with_status(401, "denied");
        assert!(supplier.access_token().await.is_err());

        supplier
            .install(TokenRecord::new("C1", "T1", NOW + 3_600_000))
            .await
            .unwrap();

        assert_eq!(supplier.access_token().await.unwrap(), "C1");
        assert_eq!(store.current().unwrap().access_token, "C1");
    }

    #[tokio::test]
    async fn test_install_during_refresh_wins() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW - 1000));
        refresher.succeed_with("A2", 3600, None);
        refresher.hold();
        let supplier = Arc::new(supplier);

        let waiter = {
            let supplier = Arc::clone(&supplier);
            tokio::spawn(async move { supplier.access_token().await })
        };
        while refresher.calls() == 0 {
            tokio::task::yield_now().await;
        }

        supplier
            .install(TokenRecord::new("LOGIN", "FRESH", NOW + 7_200_000))
            .await
            .unwrap();
        refresher.release();

        assert_eq!(waiter.await.unwrap().unwrap(), "LOGIN");

        let cached = supplier.cache().get().await.unwrap();
        assert_eq!(cached.access_token, "LOGIN");
        assert_eq!(cached.refresh_token, "FRESH");
        assert_eq!(store.current(), Some(cached));

        assert_eq!(supplier.access_token().await.unwrap(), "LOGIN");
        assert_eq!(supplier.state().await, SupplierState::Valid);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_install_refuses_invalid_record() {
        let (store, _refresher, _clock, supplier) = harness();

        let result = supplier.install(TokenRecord::new("", "R1", NOW)).await;

        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
        assert!(store.current().is_none());
        assert!(supplier.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_install_keeps_cache_when_save_fails() {
        let (store, _refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW + 3_600_000));
        assert_eq!(supplier.access_token().await.unwrap(), "A1");
        store.fail_saves();

        let result = supplier
            .install(TokenRecord::new("B1", "S1", NOW + 3_600_000))
            .await;

        assert!(result.is_err());
        assert_eq!(supplier.access_token().await.unwrap(), "A1");
    }

    #[tokio::test]
    async fn test_state_follows_the_clock() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(NOW));
        let refresher = Arc::new(FakeRefresher::new(store.clone(), clock.clone()));
        let supplier = TokenSupplier::new(store.clone(), refresher, clock.clone());

        assert_eq!(supplier.state().await, SupplierState::Absent);

        store.put(TokenRecord::new("A1", "R1", NOW + SAFETY_MARGIN_MS + 1));
        assert_eq!(supplier.state().await, SupplierState::Valid);

        clock.advance(2);
        assert_eq!(supplier.state().await, SupplierState::ExpiringSoon);
    }

    #[tokio::test]
    async fn test_save_failure_during_refresh_is_reported() {
        let (store, refresher, _clock, supplier) = harness();
        store.put(TokenRecord::new("A1", "R1", NOW - 1000));
        refresher.succeed_with("A2", 3600, None);
        store.fail_saves();

        let result = supplier.access_token().await;

        match result {
            Err(SupplyError::Refresh(cause)) => {
                assert!(matches!(cause.as_ref(), RefreshError::SaveFailed(_)));
            }
            other => panic!("expected save failure, got {other:?}"),
        }
        assert_eq!(supplier.cache().get().await.unwrap().access_token, "A1");
    }
}
