//! RecordStore trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tokenvet_domain::TokenOutcome;

use crate::error::StorageResult;

/// A persisted successful check, keyed by token.
///
/// Re-checking the same token overwrites the record with a fresh timestamp
/// (last-seen semantics); there is no append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedRecord {
    pub token: String,
    pub account_id: String,
    pub username: String,
    /// Time of the most recent successful check, epoch milliseconds.
    pub checked_at_ms: i64,
    pub valid: bool,
}

/// Abstract storage interface for verified records.
///
/// Implementations must be thread-safe (Send + Sync); multiple independent
/// check requests may save and read concurrently. Readers must see either
/// the pre- or post-write state of a record, never a partial one.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Upserts the record for a successful outcome.
    ///
    /// Returns [`StorageError::InvalidRecord`](crate::error::StorageError)
    /// when called with an invalid outcome or one missing its profile.
    async fn save(&self, outcome: &TokenOutcome) -> StorageResult<VerifiedRecord>;

    /// Returns all records, in no particular order.
    async fn get_all(&self) -> StorageResult<Vec<VerifiedRecord>>;

    /// Returns the records for one account id via the secondary index.
    async fn get_by_account_id(&self, account_id: &str) -> StorageResult<Vec<VerifiedRecord>>;
}
