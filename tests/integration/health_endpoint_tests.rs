//! Integration tests for the HTTP health endpoint.
//!
//! Validates that `GET /health` returns `200 OK` with body `"ok"`.
//! Uses an ephemeral port to avoid conflicts with running instances.

use super::test_helpers::{spawn_server, test_app_state, test_config};

// ── GET /health returns 200 OK ───────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let state = test_app_state(test_config()).await;
    let ct = state.shutdown.clone();
    let base_url = spawn_server(state).await;

    let resp = reqwest::get(format!("{base_url}/health"))
        .await
        .expect("HTTP GET /health");

    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("body");
    assert_eq!(body, "ok");

    ct.cancel();
}

// ── Unknown routes return 404 ────────────────────────────────

#[tokio::test]
async fn unknown_route_returns_404() {
    let state = test_app_state(test_config()).await;
    let ct = state.shutdown.clone();
    let base_url = spawn_server(state).await;

    let resp = reqwest::get(format!("{base_url}/nope"))
        .await
        .expect("HTTP GET /nope");
    assert_eq!(resp.status(), 404);

    ct.cancel();
}
