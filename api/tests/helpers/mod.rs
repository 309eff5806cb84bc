#![allow(dead_code)]

use api::routes::routes;
use api::state::AppState;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use db::test_utils::setup_test_db;
use serde_json::Value;
use services::qr_token::TokenSigner;
use tower::ServiceExt;

pub const QR_TEST_SECRET: &[u8] = b"integration-test-qr-secret";

/// Builds the full router against a fresh in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    let state = AppState::new(setup_test_db().await, TokenSigner::new(QR_TEST_SECRET));
    let app = Router::new()
        .nest("/api", routes(state.clone()))
        .with_state(state.clone());
    (app, state)
}

pub fn bearer(principal_id: i64) -> String {
    let (token, _) = api::auth::generate_jwt(principal_id, &format!("user{principal_id}@test.edu"));
    format!("Bearer {token}")
}

/// Fires one request at the router and returns (status, parsed JSON body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    principal: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = principal {
        builder = builder.header(header::AUTHORIZATION, bearer(id));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
