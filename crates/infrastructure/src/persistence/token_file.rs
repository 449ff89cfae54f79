//! File-based token store implementation.
//!
//! The record lives in a single JSON file:
//! ```json
//! {
//!   "access_token": "eyJhbGciOi...",
//!   "refresh_token": "def50200...",
//!   "expires_at": 1700003600000,
//!   "token_type": "Bearer"
//! }
//! ```
//! Saves go to an owner-only sibling temp file that is renamed over the
//! target, so a reader sees either the old record or the new one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokenwarden_application::ports::{FileSystem, FileSystemError, StoreError, TokenStore};
use tokenwarden_domain::TokenRecord;
use tracing::{debug, warn};

use crate::persistence::TokioFileSystem;
use crate::serialization::{from_json_bytes, to_json_stable_bytes};

static TEMP_COUNTER: AtomicU32 = AtomicU32::new(0);

/// File-based token store.
#[derive(Debug, Clone)]
pub struct FileTokenStore<F = TokioFileSystem> {
    fs: F,
    path: PathBuf,
}

impl FileTokenStore<TokioFileSystem> {
    /// Creates a store for `path` on the local file system.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(TokioFileSystem::new(), path)
    }
}

impl<F: FileSystem> FileTokenStore<F> {
    /// Creates a store for `path` on `fs`.
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique sibling path for an in-progress write. Concurrent saves never
    /// share a temp file.
    fn temp_path(&self) -> PathBuf {
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map_or_else(|| "token".into(), |n| n.to_string_lossy());
        self.path
            .with_file_name(format!("{name}.{}.{seq}.tmp", std::process::id()))
    }
}

#[async_trait]
impl<F: FileSystem> TokenStore for FileTokenStore<F> {
    async fn load(&self) -> Option<TokenRecord> {
        let content = match self.fs.read_file(&self.path).await {
            Ok(content) => content,
            Err(FileSystemError::NotFound(_)) => {
                debug!(path = %self.path.display(), "no token file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file unreadable");
                return None;
            }
        };

        let record: TokenRecord = match from_json_bytes(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token file is not a valid record");
                return None;
            }
        };

        if let Err(e) = record.validate() {
            warn!(path = %self.path.display(), error = %e, "ignoring stored token record");
            return None;
        }

        Some(record)
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        record.validate()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(record)?;

        let temp = self.temp_path();
        let written = match self.fs.write_file(&temp, &content).await {
            Ok(()) => self.fs.rename(&temp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = self.fs.remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(
            path = %self.path.display(),
            access = %record.access_preview(),
            expires_at = record.expires_at,
            "token record saved"
        );
        Ok(())
    }
}
