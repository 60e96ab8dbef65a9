//! Upstream identity API client.
//!
//! The one place in the pipeline that talks to the identity provider. The
//! whole failure surface of that call — rejection statuses, malformed
//! bodies, transport faults, timeouts — is folded into invalid
//! [`TokenOutcome`]s here so nothing upstream-shaped ever propagates as an
//! error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use tokenvet_domain::{AccountProfile, TokenOutcome, TokenVerifier};

use crate::config::UpstreamSettings;

/// Path of the identity endpoint relative to the configured base URL.
const IDENTITY_PATH: &str = "/users/@me";

/// Fallback message when the upstream rejection carries no usable detail.
const GENERIC_FAILURE: &str = "Failed to verify token with the upstream identity API.";

/// `TokenVerifier` implementation backed by the real identity API.
///
/// Every call hits upstream; there is no caching and no automatic retry
/// (a 429 is reported to the caller, who may retry later).
#[derive(Debug, Clone)]
pub struct UpstreamVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamVerifier {
    /// Builds a verifier from upstream settings, with a bounded per-call
    /// timeout.
    pub fn from_settings(settings: &UpstreamSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn identity_url(&self) -> String {
        format!("{}{IDENTITY_PATH}", self.base_url)
    }
}

#[async_trait]
impl TokenVerifier for UpstreamVerifier {
    async fn verify(&self, token: &str) -> TokenOutcome {
        let response = match self
            .client
            .get(self.identity_url())
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("upstream transport failure: {e}");
                return TokenOutcome::invalid(token, e.to_string());
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                debug!("failed reading upstream body: {e}");
                return TokenOutcome::invalid(token, e.to_string());
            }
        };

        if !status.is_success() {
            return TokenOutcome::invalid(token, classify_failure(status, &body));
        }

        match AccountProfile::from_json(&body) {
            Ok(user) => TokenOutcome::valid(token, user),
            Err(message) => TokenOutcome::invalid(token, message),
        }
    }
}

/// Maps an upstream rejection status to the caller-facing message.
fn classify_failure(status: StatusCode, body: &[u8]) -> String {
    match status {
        StatusCode::UNAUTHORIZED => {
            "Invalid token. The token you provided is invalid or has expired.".to_string()
        }
        StatusCode::TOO_MANY_REQUESTS => "Rate limited. Please try again later.".to_string(),
        _ => upstream_message(body).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
    }
}

/// Pulls the `message` field out of an upstream error body, if any.
fn upstream_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Request;
    use axum::http::header::AUTHORIZATION;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    const TEST_TOKEN: &str = "test-token.value";

    fn profile_body() -> serde_json::Value {
        json!({
            "id": "123",
            "username": "jay",
            "discriminator": "0",
            "avatar": null,
            "email": null,
            "phone": null,
            "mfa_enabled": false
        })
    }

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn verifier_for(base_url: String) -> UpstreamVerifier {
        UpstreamVerifier::from_settings(&UpstreamSettings {
            base_url,
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_yields_profile() {
        let router = Router::new().route(
            "/users/@me",
            get(|request: Request| async move {
                // The token must arrive as the Authorization header
                let auth = request
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth == TEST_TOKEN {
                    Json(profile_body()).into_response()
                } else {
                    (axum::http::StatusCode::UNAUTHORIZED, Json(json!({}))).into_response()
                }
            }),
        );
        let base = spawn_stub(router).await;

        let outcome = verifier_for(base).verify(TEST_TOKEN).await;
        assert!(outcome.valid, "outcome: {outcome:?}");
        let user = outcome.user.unwrap();
        assert_eq!(user.id, "123");
        assert_eq!(user.username, "jay");
        assert_eq!(outcome.token, TEST_TOKEN);
    }

    #[tokio::test]
    async fn test_unauthorized_is_classified_as_expired() {
        let router = Router::new().route(
            "/users/@me",
            get(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(json!({"message": "401: Unauthorized"})),
                )
            }),
        );
        let base = spawn_stub(router).await;

        let outcome = verifier_for(base).verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        let error = outcome.error.unwrap();
        assert!(error.contains("invalid or has expired"), "got: {error}");
    }

    #[tokio::test]
    async fn test_rate_limit_is_classified() {
        let router = Router::new().route(
            "/users/@me",
            get(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, Json(json!({}))) }),
        );
        let base = spawn_stub(router).await;

        let outcome = verifier_for(base).verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        assert!(outcome.error.unwrap().contains("Rate limited"));
    }

    #[tokio::test]
    async fn test_other_failure_passes_upstream_message_through() {
        let router = Router::new().route(
            "/users/@me",
            get(|| async {
                (
                    axum::http::StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"message": "identity API is down for maintenance"})),
                )
            }),
        );
        let base = spawn_stub(router).await;

        let outcome = verifier_for(base).verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        assert_eq!(
            outcome.error.as_deref(),
            Some("identity API is down for maintenance")
        );
    }

    #[tokio::test]
    async fn test_other_failure_without_message_uses_generic() {
        let router = Router::new().route(
            "/users/@me",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "not json") }),
        );
        let base = spawn_stub(router).await;

        let outcome = verifier_for(base).verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some(GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_invalid_not_panic() {
        let router = Router::new().route(
            "/users/@me",
            get(|| async { (axum::http::StatusCode::OK, r#"{"id": 5}"#) }),
        );
        let base = spawn_stub(router).await;

        let outcome = verifier_for(base).verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        assert!(outcome
            .error
            .unwrap()
            .contains("unexpected response shape"));
    }

    #[tokio::test]
    async fn test_connection_refused_becomes_invalid_outcome() {
        // Bind then drop to obtain a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = verifier_for(format!("http://{addr}")).verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out_as_invalid_outcome() {
        let router = Router::new().route(
            "/users/@me",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(profile_body())
            }),
        );
        let base = spawn_stub(router).await;

        let verifier = UpstreamVerifier::from_settings(&UpstreamSettings {
            base_url: base,
            timeout_secs: 1,
        })
        .unwrap();

        let outcome = verifier.verify(TEST_TOKEN).await;
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let verifier = verifier_for("https://identity.internal/api/".to_string());
        assert_eq!(
            verifier.identity_url(),
            "https://identity.internal/api/users/@me"
        );
    }
}
