//! Error types for the core operations.

use cdkgate_store::StoreError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by generation, verification, and delivery.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input, rejected before touching the store.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested thing does not exist (unknown code, no staged asset).
    #[error("not found: {0}")]
    NotFound(String),

    /// A policy conflict: duplicate code on creation, or the code space is
    /// pathologically full. Not retried automatically.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The device holds no binding; it learns nothing beyond this.
    #[error("unauthorized")]
    Unauthorized,

    /// Store failure. Transient variants are safe to retry wholesale since
    /// no partial write is ever visible.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// IO error while resolving the staged asset.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }
}

impl From<cdkgate_types::Error> for CoreError {
    fn from(e: cdkgate_types::Error) -> Self {
        // Type errors reach the core only through input parsing.
        Self::Validation(e.to_string())
    }
}
