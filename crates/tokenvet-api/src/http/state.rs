//! Application state for HTTP handlers.

use std::sync::Arc;

use tokenvet_domain::TokenVerifier;
use tokenvet_server::handlers::batch::BatchPolicy;
use tokenvet_server::{TokenPipeline, WebhookAuditSink};
use tokenvet_storage::RecordStore;

/// Application state shared across all HTTP handlers.
///
/// Generic over the verifier and storage seams so the whole HTTP surface
/// can be exercised in tests with scripted implementations. Constructed
/// once at service start and torn down with the process; nothing here is
/// module-global.
pub struct AppState<V: TokenVerifier, S: RecordStore> {
    /// The verification pipeline (check one / check many).
    pub pipeline: Arc<TokenPipeline<V, S>>,
    /// The record store, read directly by the enumeration endpoints.
    pub store: Arc<S>,
    /// The audit sink for request-level events.
    pub audit: Arc<WebhookAuditSink>,
}

impl<V: TokenVerifier, S: RecordStore> AppState<V, S> {
    /// Creates application state over the given stages.
    pub fn new(
        verifier: Arc<V>,
        store: Arc<S>,
        audit: Arc<WebhookAuditSink>,
        policy: BatchPolicy,
    ) -> Self {
        let pipeline = Arc::new(TokenPipeline::new(
            verifier,
            Arc::clone(&store),
            Arc::clone(&audit),
            policy,
        ));
        Self {
            pipeline,
            store,
            audit,
        }
    }
}
