//! Pipeline facade: the single entry point for check operations.
//!
//! Ties the verifier, the record store and the audit sink together behind
//! `check_one` / `check_many`. Callers (the HTTP layer) never touch the
//! stages directly.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use tokenvet_domain::validation::validate_token_format;
use tokenvet_domain::{BatchSummary, DomainResult, TokenOutcome, TokenVerifier};
use tokenvet_storage::RecordStore;

use crate::audit::{AuditEvent, AuditKind, WebhookAuditSink};
use crate::handlers::batch::{BatchPolicy, BatchRunner};

/// The verification pipeline.
///
/// Generic over the verifier and store seams so tests can swap in
/// scripted implementations; production wires the upstream verifier and
/// the in-memory store.
pub struct TokenPipeline<V, S> {
    verifier: Arc<V>,
    store: Arc<S>,
    audit: Arc<WebhookAuditSink>,
    batch: BatchRunner<V, S>,
}

impl<V, S> TokenPipeline<V, S>
where
    V: TokenVerifier,
    S: RecordStore,
{
    /// Creates a pipeline over the given stages.
    pub fn new(
        verifier: Arc<V>,
        store: Arc<S>,
        audit: Arc<WebhookAuditSink>,
        policy: BatchPolicy,
    ) -> Self {
        let batch = BatchRunner::new(
            Arc::clone(&verifier),
            Arc::clone(&store),
            Arc::clone(&audit),
            policy,
        );
        Self {
            verifier,
            store,
            audit,
            batch,
        }
    }

    /// Checks a single token.
    ///
    /// The format precondition is enforced before any network call; a
    /// malformed token returns a validation error and nothing else
    /// happens. A verified token is persisted exactly like the batch
    /// path; a persistence failure is reported on the audit channel while
    /// the outcome still goes back to the caller.
    pub async fn check_one(&self, token: &str) -> DomainResult<TokenOutcome> {
        validate_token_format(token)?;

        let outcome = self.verifier.verify(token).await;

        if outcome.valid {
            if let Some(user) = &outcome.user {
                self.audit
                    .emit(
                        AuditEvent::new(
                            AuditKind::Login,
                            format!("credential verified for account {}", user.id),
                        )
                        .with_data(json!({ "token": token, "account_id": user.id })),
                    )
                    .await;
            }
            if let Err(e) = self.store.save(&outcome).await {
                warn!("failed to persist verified record: {e}");
                self.audit
                    .emit(AuditEvent::new(
                        AuditKind::Error,
                        format!("failed to persist verified record: {e}"),
                    ))
                    .await;
            }
        }

        Ok(outcome)
    }

    /// Checks a newline-delimited blob of tokens with the configured
    /// truncation and pacing policy.
    pub async fn check_many(&self, raw_input: &str) -> DomainResult<BatchSummary> {
        self.batch.run(raw_input).await
    }
}
