//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `save` was called with an outcome that is not a successful check.
    #[error("cannot persist an invalid outcome for token ending {token_tail}")]
    InvalidRecord { token_tail: String },

    /// Internal error from a backing store.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
