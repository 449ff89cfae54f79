//! Real file system implementation.

use std::io;
use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokenwarden_application::ports::{FileSystem, FileSystemError};

/// Mode for files this adapter creates; they may hold credentials.
#[cfg(unix)]
const OWNER_ONLY_MODE: u32 = 0o600;

fn map_io_error(path: &Path, error: io::Error) -> FileSystemError {
    match error.kind() {
        io::ErrorKind::NotFound => FileSystemError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => FileSystemError::PermissionDenied(path.to_path_buf()),
        _ => FileSystemError::Io(error),
    }
}

/// Real file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for TokioFileSystem {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        fs::read(path).await.map_err(|e| map_io_error(path, e))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FileSystemError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(OWNER_ONLY_MODE);

        let mut file = options.open(path).await.map_err(|e| map_io_error(path, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| map_io_error(path, e))?;
        file.flush().await.map_err(|e| map_io_error(path, e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::remove_file(path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
        fs::rename(from, to).await.map_err(|e| map_io_error(from, e))
    }
}
