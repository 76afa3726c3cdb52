//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this code already exists.
    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    /// The store is busy (lock contention past the busy timeout). Transient;
    /// the whole operation is safe to retry, no partial write is visible.
    #[error("store busy, retry later")]
    Busy,

    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// Persisted data violates the record invariants.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(ffi, _)
                if ffi.code == rusqlite::ErrorCode::DatabaseBusy
                    || ffi.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Self::Busy
            }
            _ => Self::Database(e),
        }
    }
}
