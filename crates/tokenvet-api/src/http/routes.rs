//! HTTP route definitions and handlers.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;

use tokenvet_domain::{DomainError, TokenVerifier};
use tokenvet_server::{AuditEvent, AuditKind};
use tokenvet_storage::{RecordStore, StorageError, VerifiedRecord};

use super::state::AppState;

/// Custom JSON extractor that returns 400 Bad Request instead of 422
/// Unprocessable Entity for deserialization errors, so malformed bodies
/// and malformed tokens surface the same way.
///
/// Preserves 413 Payload Too Large for body limit errors.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                use axum::extract::rejection::JsonRejection;

                let status = match &rejection {
                    JsonRejection::BytesRejection(_) => {
                        // BytesRejection wraps body limit errors - keep 413
                        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                            StatusCode::PAYLOAD_TOO_LARGE
                        } else {
                            StatusCode::BAD_REQUEST
                        }
                    }
                    _ => StatusCode::BAD_REQUEST,
                };

                let message = rejection.body_text();
                let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message)
                } else {
                    ApiError::validation_error(message)
                };

                Err((status, Json(error)))
            }
        }
    }
}

/// Default request body size limit (1MB).
/// This prevents memory exhaustion from oversized bulk payloads.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// API error codes.
pub mod error_codes {
    /// Input validation error (malformed token or bulk payload shape).
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// Request body exceeds maximum allowed size.
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    /// Unexpected internal server error.
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// API error response format.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error (400).
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    /// Creates an internal error (500).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use error_codes::*;

        let status = match self.code.as_str() {
            VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        // Every domain error is an input validation failure; upstream
        // rejections never reach this type (they live in the outcome body)
        ApiError::validation_error(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        error!("storage error: {}", err);
        ApiError::internal_error("server error while accessing saved records")
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Creates the HTTP router with all endpoints.
///
/// Applies the default body size limit (1MB).
pub fn create_router<V: TokenVerifier, S: RecordStore>(state: AppState<V, S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<V: TokenVerifier, S: RecordStore>(
    state: AppState<V, S>,
    body_limit: usize,
) -> Router {
    let shared_state = Arc::new(state);
    Router::new()
        .route("/api/check-token", post(check_token::<V, S>))
        .route("/api/check-tokens", post(check_tokens::<V, S>))
        .route("/api/saved-tokens", get(saved_tokens::<V, S>))
        .route(
            "/api/saved-tokens/:account_id",
            get(saved_tokens_by_account::<V, S>),
        )
        // Health and readiness checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<V, S>))
        .with_state(shared_state)
        .layer(RequestBodyLimitLayer::new(body_limit))
}

// ============================================================
// Check endpoints
// ============================================================

/// Request body for a single check.
#[derive(Debug, Deserialize)]
pub struct CheckTokenRequest {
    pub token: String,
}

/// Request body for a bulk check: a newline-delimited blob.
#[derive(Debug, Deserialize)]
pub struct CheckTokensRequest {
    pub tokens: String,
}

/// Checks one token.
///
/// Both verified and rejected tokens return 200 - validity travels in the
/// body, so the single and bulk paths behave uniformly for callers. Only
/// a format violation yields a 400.
async fn check_token<V: TokenVerifier, S: RecordStore>(
    State(state): State<Arc<AppState<V, S>>>,
    JsonBadRequest(body): JsonBadRequest<CheckTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .audit
        .emit(AuditEvent::new(
            AuditKind::Request,
            "single token check received",
        ))
        .await;

    let outcome = state.pipeline.check_one(&body.token).await?;
    Ok(Json(outcome))
}

/// Checks a newline-delimited blob of tokens.
async fn check_tokens<V: TokenVerifier, S: RecordStore>(
    State(state): State<Arc<AppState<V, S>>>,
    JsonBadRequest(body): JsonBadRequest<CheckTokensRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .audit
        .emit(
            AuditEvent::new(AuditKind::Request, "bulk token check received")
                .with_data(json!({ "bytes": body.tokens.len() })),
        )
        .await;

    let summary = state.pipeline.check_many(&body.tokens).await?;
    Ok(Json(summary))
}

// ============================================================
// Saved-record endpoints
// ============================================================

/// Response for the record enumeration endpoints.
#[derive(Debug, Serialize)]
pub struct SavedTokensResponse {
    pub tokens: Vec<VerifiedRecord>,
    pub count: usize,
}

impl SavedTokensResponse {
    fn from_records(mut tokens: Vec<VerifiedRecord>) -> Self {
        // Newest first for deterministic output; the store itself is
        // unordered
        tokens.sort_by(|a, b| b.checked_at_ms.cmp(&a.checked_at_ms));
        let count = tokens.len();
        Self { tokens, count }
    }
}

/// Lists every verified record.
async fn saved_tokens<V: TokenVerifier, S: RecordStore>(
    State(state): State<Arc<AppState<V, S>>>,
) -> ApiResult<impl IntoResponse> {
    let records = state.store.get_all().await?;
    Ok(Json(SavedTokensResponse::from_records(records)))
}

/// Lists the verified records for one account id.
async fn saved_tokens_by_account<V: TokenVerifier, S: RecordStore>(
    State(state): State<Arc<AppState<V, S>>>,
    Path(account_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let records = state.store.get_by_account_id(&account_id).await?;
    Ok(Json(SavedTokensResponse::from_records(records)))
}

// ============================================================
// Probes
// ============================================================

/// Basic health check - returns 200 if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness check - validates that the record store is accessible.
///
/// Error details are logged but not exposed in the response.
async fn readiness_check<V: TokenVerifier, S: RecordStore>(
    State(state): State<Arc<AppState<V, S>>>,
) -> impl IntoResponse {
    match state.store.get_all().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": { "storage": "ok" }
            })),
        ),
        Err(e) => {
            error!("readiness check failed: storage unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "checks": { "storage": "unavailable" }
                })),
            )
        }
    }
}
