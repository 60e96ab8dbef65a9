//! End-to-end tests: router + pipeline + real upstream client against a
//! stub identity API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Json, Router,
};
use serde_json::json;
use tower::ServiceExt; // for oneshot

use tokenvet_api::http::{create_router, AppState};
use tokenvet_server::config::UpstreamSettings;
use tokenvet_server::handlers::batch::BatchPolicy;
use tokenvet_server::{UpstreamVerifier, WebhookAuditSink};
use tokenvet_storage::MemoryRecordStore;

/// The one token the stub identity API accepts.
fn live_token() -> String {
    format!("{}.{}", "l".repeat(30), "t".repeat(30))
}

/// Well-formed but rejected by the stub.
fn dead_token() -> String {
    format!("{}.{}", "d".repeat(30), "t".repeat(30))
}

/// Stub identity API: answers the profile for `live_token`, 401 otherwise.
async fn spawn_stub_upstream() -> String {
    let expected = live_token();
    let router = Router::new().route(
        "/users/@me",
        get(move |request: Request<Body>| {
            let expected = expected.clone();
            async move {
                let auth = request
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if auth == expected {
                    Json(json!({
                        "id": "123",
                        "username": "jay",
                        "discriminator": "0",
                        "avatar": null,
                        "email": null,
                        "phone": null
                    }))
                    .into_response()
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"message": "401: Unauthorized"})),
                    )
                        .into_response()
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn test_app(max_tokens: usize) -> (axum::Router, Arc<MemoryRecordStore>) {
    let base_url = spawn_stub_upstream().await;
    let verifier = Arc::new(
        UpstreamVerifier::from_settings(&UpstreamSettings {
            base_url,
            timeout_secs: 2,
        })
        .unwrap(),
    );
    let store = MemoryRecordStore::new_shared();
    let state = AppState::new(
        verifier,
        Arc::clone(&store),
        Arc::new(WebhookAuditSink::disabled()),
        BatchPolicy {
            max_tokens,
            item_delay: Duration::from_millis(0),
        },
    );
    (create_router(state), store)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Scenario: malformed input is rejected before any upstream call.
#[tokio::test]
async fn test_short_token_is_rejected_without_upstream() {
    let (app, store) = test_app(100).await;

    let response = app
        .oneshot(post_json("/api/check-token", json!({"token": "abc"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(store.is_empty());
}

/// Scenario: upstream 401 comes back as a 200 with an invalid outcome and
/// nothing is persisted.
#[tokio::test]
async fn test_expired_token_roundtrip() {
    let (app, store) = test_app(100).await;

    let response = app
        .oneshot(post_json("/api/check-token", json!({"token": dead_token()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("invalid or has expired"));
    assert!(store.is_empty());
}

/// Scenario: a live token verifies, returns the profile, and shows up in
/// the per-account record listing.
#[tokio::test]
async fn test_live_token_roundtrip_and_lookup() {
    let (app, _store) = test_app(100).await;

    let response = app
        .clone()
        .oneshot(post_json("/api/check-token", json!({"token": live_token()})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["id"], "123");
    assert_eq!(body["user"]["username"], "jay");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/saved-tokens/123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["tokens"][0]["account_id"], "123");
    assert_eq!(body["tokens"][0]["valid"], true);
}

/// Scenario: a mixed bulk blob aggregates counts, keeps order, persists
/// only the live token.
#[tokio::test]
async fn test_bulk_roundtrip_mixed_outcomes() {
    let (app, store) = test_app(100).await;

    let blob = format!("{}\n{}", dead_token(), live_token());
    let response = app
        .oneshot(post_json("/api/check-tokens", json!({"tokens": blob})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"]["total"], 2);
    assert_eq!(body["count"]["valid"], 1);
    assert_eq!(body["count"]["invalid"], 1);
    assert_eq!(body["truncated"], false);
    assert_eq!(body["results"][0]["valid"], false);
    assert_eq!(body["results"][1]["valid"], true);
    assert_eq!(store.len(), 1);
}

/// Scenario: oversized bulk input processes only the head and flags
/// truncation.
#[tokio::test]
async fn test_bulk_truncation_over_http() {
    let (app, _store) = test_app(2).await;

    let blob = format!("{}\n{}\n{}", dead_token(), dead_token(), live_token());
    let response = app
        .oneshot(post_json("/api/check-tokens", json!({"tokens": blob})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["truncated"], true);
    assert_eq!(body["count"]["total"], 2);
    // The live token was in the dropped tail
    assert_eq!(body["count"]["valid"], 0);
}
