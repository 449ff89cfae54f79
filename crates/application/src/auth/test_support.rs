//! In-memory fakes for the supplier and gate tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokenwarden_domain::{TokenGrant, TokenRecord};

use super::TokenSupplier;
use crate::ports::{
    Clock, FileSystemError, ManualClock, RefreshClient, RefreshError, StoreError, TokenStore,
};

pub const NOW: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<TokenRecord>>,
    loads: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn put(&self, record: TokenRecord) {
        *self.record.lock().unwrap() = Some(record);
    }

    pub fn current(&self) -> Option<TokenRecord> {
        self.record.lock().unwrap().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self) -> Option<TokenRecord> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.current()
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(FileSystemError::Io(std::io::Error::other(
                "disk full",
            ))));
        }
        self.put(record.clone());
        Ok(())
    }
}

#[derive(Clone)]
enum Response {
    Grant(TokenGrant),
    Status(u16, String),
}

/// Refresh client that behaves like the real one (grant -> record -> save)
/// without a network.
pub struct FakeRefresher {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    response: Mutex<Option<Response>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeRefresher {
    pub fn new(store: Arc<MemoryStore>, clock: Arc<ManualClock>) -> Self {
        Self {
            store,
            clock,
            response: Mutex::new(None),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn succeed_with(&self, access_token: &str, expires_in: u64, refresh_token: Option<&str>) {
        *self.response.lock().unwrap() = Some(Response::Grant(TokenGrant {
            access_token: access_token.to_string(),
            expires_in,
            refresh_token: refresh_token.map(String::from),
            scope: None,
            token_type: None,
            extra: BTreeMap::new(),
        }));
    }

    pub fn fail_with_status(&self, status: u16, body: &str) {
        *self.response.lock().unwrap() = Some(Response::Status(status, body.to_string()));
    }

    /// Park every refresh until [`Self::release`] is called.
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(64);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_refresh_tokens(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefreshClient for FakeRefresher {
    async fn refresh(&self, current: &TokenRecord) -> Result<TokenRecord, RefreshError> {
        if current.refresh_token.is_empty() {
            return Err(RefreshError::NoRefreshToken);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(current.refresh_token.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let response = self.response.lock().unwrap().clone();
        let grant = match response {
            Some(Response::Grant(grant)) => grant,
            Some(Response::Status(status, body)) => {
                return Err(RefreshError::Transport { status, body });
            }
            None => return Err(RefreshError::Network("no response scripted".to_string())),
        };

        let next = TokenRecord::from_grant(grant, current, self.clock.now_millis())
            .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
        self.store.save(&next).await?;
        Ok(next)
    }
}

pub fn harness() -> (
    Arc<MemoryStore>,
    Arc<FakeRefresher>,
    Arc<ManualClock>,
    TokenSupplier,
) {
    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(NOW));
    let refresher = Arc::new(FakeRefresher::new(store.clone(), clock.clone()));
    let supplier = TokenSupplier::new(store.clone(), refresher.clone(), clock.clone());
    (store, refresher, clock, supplier)
}
