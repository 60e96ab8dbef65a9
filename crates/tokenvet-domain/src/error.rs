//! Domain error types for token verification operations.

use thiserror::Error;

/// Minimum accepted token length for the single-check path.
pub const MIN_TOKEN_LENGTH: usize = 50;

/// Domain-specific errors for verification operations.
///
/// These are caller-facing validation failures. Upstream rejections and
/// transport faults are NOT errors at this level; the verifier converts
/// them into invalid [`TokenOutcome`](crate::outcome::TokenOutcome)s.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Token failed the format precondition (length / separator).
    #[error(
        "invalid token format: token must be at least {MIN_TOKEN_LENGTH} characters and contain a period (.)"
    )]
    InvalidTokenFormat,

    /// Bulk input contained no usable tokens after trimming.
    #[error("no tokens provided: enter at least one non-empty line")]
    EmptyBatch,

    /// Bulk input was not the expected newline-delimited string shape.
    #[error("invalid bulk input: {message}")]
    InvalidBulkInput { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
