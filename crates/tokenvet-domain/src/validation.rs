//! Input validation for tokens and bulk payloads.
//!
//! Format validation happens before any network call; a token that fails
//! here is never sent upstream.

use crate::error::{DomainError, DomainResult, MIN_TOKEN_LENGTH};

/// Validates the minimal token format precondition.
///
/// Tokens are opaque, but the upstream format always has a minimum length
/// and at least one `.` separator, so anything shorter is rejected without
/// a network round-trip.
pub fn validate_token_format(token: &str) -> DomainResult<()> {
    if token.len() < MIN_TOKEN_LENGTH || !token.contains('.') {
        return Err(DomainError::InvalidTokenFormat);
    }
    Ok(())
}

/// Parses a newline-delimited bulk payload into candidate tokens.
///
/// Lines are trimmed and empty lines dropped; this is the only accepted
/// bulk input shape. Returns [`DomainError::EmptyBatch`] if nothing
/// remains.
pub fn parse_batch_input(raw: &str) -> DomainResult<Vec<String>> {
    let tokens: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        return Err(DomainError::EmptyBatch);
    }

    Ok(tokens)
}
