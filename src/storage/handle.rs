//! Async-safe handle to the storage layer.

use crate::error::{Result, TrackletError};
use crate::storage::SqliteStorage;
use std::sync::{Arc, Mutex};

/// Shared handle to [`SqliteStorage`] for use from async handlers.
///
/// Wraps the storage behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous
/// SQLite I/O from tying up async worker threads.
#[derive(Clone)]
pub struct StorageHandle {
    inner: Arc<Mutex<SqliteStorage>>,
}

impl StorageHandle {
    #[must_use]
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Run a closure with exclusive storage access on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or a storage error if the blocking
    /// task panicked or the lock is poisoned.
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SqliteStorage) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let storage = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = storage.lock().map_err(|_| TrackletError::Storage {
                op: "lock storage",
                source: "storage mutex poisoned".into(),
            })?;
            f(&mut guard)
        })
        .await
        .map_err(|e| TrackletError::storage("storage task", e))?
    }
}
