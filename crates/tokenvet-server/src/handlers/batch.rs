//! Paced batch orchestrator.
//!
//! Drives sequential verification over a bounded token list. The
//! serialization and the inter-item delay are deliberate: they keep the
//! pipeline under the upstream rate limit. Do not parallelize the
//! per-token calls without re-deriving a rate-limit-safe bound.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::warn;

use tokenvet_domain::validation::parse_batch_input;
use tokenvet_domain::{BatchSummary, CheckCounts, DomainResult, TokenVerifier};
use tokenvet_storage::RecordStore;

use crate::audit::{AuditEvent, AuditKind, WebhookAuditSink};
use crate::config::BatchSettings;

/// Truncation and pacing policy for one batch run.
#[derive(Debug, Clone)]
pub struct BatchPolicy {
    /// Tokens beyond this many are dropped from the tail.
    pub max_tokens: usize,
    /// Sleep after each verified item.
    pub item_delay: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            max_tokens: 100,
            item_delay: Duration::from_millis(200),
        }
    }
}

impl From<&BatchSettings> for BatchPolicy {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            item_delay: Duration::from_millis(settings.item_delay_ms),
        }
    }
}

/// Orchestrates one bulk verification run end to end: parse, truncate,
/// verify sequentially with pacing, persist the successes, aggregate.
pub struct BatchRunner<V, S> {
    verifier: Arc<V>,
    store: Arc<S>,
    audit: Arc<WebhookAuditSink>,
    policy: BatchPolicy,
}

impl<V, S> BatchRunner<V, S>
where
    V: TokenVerifier,
    S: RecordStore,
{
    /// Creates a new batch runner.
    pub fn new(
        verifier: Arc<V>,
        store: Arc<S>,
        audit: Arc<WebhookAuditSink>,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            verifier,
            store,
            audit,
            policy,
        }
    }

    /// Runs a batch over a newline-delimited token blob.
    ///
    /// Outcomes come back in input order (post-truncation). One item's
    /// failure is recorded in its outcome, never escalated; the only error
    /// this returns is the empty-input validation failure, raised before
    /// any network call.
    pub async fn run(&self, raw_input: &str) -> DomainResult<BatchSummary> {
        let tokens = parse_batch_input(raw_input)?;

        let truncated = tokens.len() > self.policy.max_tokens;
        let to_check = &tokens[..tokens.len().min(self.policy.max_tokens)];

        let mut results = Vec::with_capacity(to_check.len());
        for token in to_check {
            let outcome = self.verifier.verify(token).await;
            self.audit
                .emit(
                    AuditEvent::new(
                        AuditKind::TokenCheck,
                        if outcome.valid {
                            "token verified"
                        } else {
                            "token rejected"
                        },
                    )
                    .with_data(json!({ "token": token, "valid": outcome.valid })),
                )
                .await;
            results.push(outcome);
            tokio::time::sleep(self.policy.item_delay).await;
        }

        // Persist the successes in outcome order. A store failure is
        // surfaced on the audit channel only; the batch result stands.
        for outcome in results.iter().filter(|o| o.valid) {
            if let Err(e) = self.store.save(outcome).await {
                warn!("failed to persist verified record: {e}");
                self.audit
                    .emit(AuditEvent::new(
                        AuditKind::Error,
                        format!("failed to persist verified record: {e}"),
                    ))
                    .await;
            }
        }

        let count = CheckCounts::from_outcomes(&results);
        Ok(BatchSummary {
            results,
            count,
            truncated,
        })
    }
}
