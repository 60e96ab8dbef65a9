//! In-memory storage implementation.
//!
//! Uses a `DashMap` keyed by token as the primary store plus a second
//! `DashMap` grouping tokens by account id. The two are always updated
//! together inside `save`, so every record reachable through the index is
//! reachable through the primary key and vice versa.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use tokenvet_domain::TokenOutcome;

use crate::error::{StorageError, StorageResult};
use crate::traits::{RecordStore, VerifiedRecord};

/// In-memory implementation of RecordStore.
///
/// # Performance Characteristics
///
/// - **Save**: O(1) average (two DashMap operations)
/// - **Get all**: O(N) over stored records
/// - **Get by account**: O(K) where K is the account's record count
///
/// DashMap gives atomic per-entry visibility without an outer lock, which
/// satisfies the "pre- or post-write state per record" read guarantee.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    /// Primary map: token -> record.
    records: DashMap<String, VerifiedRecord>,
    /// Secondary index: account id -> tokens owned by that account.
    by_account: DashMap<String, HashSet<String>>,
}

impl MemoryRecordStore {
    /// Creates a new in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory record store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn last_chars(token: &str, n: usize) -> String {
        let count = token.chars().count();
        token.chars().skip(count.saturating_sub(n)).collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, outcome: &TokenOutcome) -> StorageResult<VerifiedRecord> {
        let user = match (&outcome.user, outcome.valid) {
            (Some(user), true) => user,
            _ => {
                return Err(StorageError::InvalidRecord {
                    token_tail: Self::last_chars(&outcome.token, 5),
                })
            }
        };

        let record = VerifiedRecord {
            token: outcome.token.clone(),
            account_id: user.id.clone(),
            username: user.username.clone(),
            checked_at_ms: chrono::Utc::now().timestamp_millis(),
            valid: true,
        };

        let previous = self.records.insert(outcome.token.clone(), record.clone());

        // Keep the secondary index in lockstep with the primary map. A
        // token that re-verified under a different account id migrates out
        // of the stale bucket.
        if let Some(prev) = previous {
            if prev.account_id != record.account_id {
                if let Some(mut tokens) = self.by_account.get_mut(&prev.account_id) {
                    tokens.remove(&record.token);
                }
            }
        }
        self.by_account
            .entry(record.account_id.clone())
            .or_default()
            .insert(record.token.clone());

        Ok(record)
    }

    async fn get_all(&self) -> StorageResult<Vec<VerifiedRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn get_by_account_id(&self, account_id: &str) -> StorageResult<Vec<VerifiedRecord>> {
        let tokens: Vec<String> = self
            .by_account
            .get(account_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        // Resolve through the primary map so a reader never sees an index
        // entry without its record.
        Ok(tokens
            .iter()
            .filter_map(|token| self.records.get(token).map(|r| r.value().clone()))
            .filter(|record| record.account_id == account_id)
            .collect())
    }
}
