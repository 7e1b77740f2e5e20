//! HTTP handlers. Each returns `(StatusCode, Json<Value>)` so error bodies
//! keep the same `{error}` shape as successes keep theirs.

pub(crate) mod code;
pub(crate) mod queue;
pub(crate) mod relay;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

pub(crate) type ApiResponse = (StatusCode, Json<Value>);

pub(crate) fn bad_request(error: impl std::fmt::Display) -> ApiResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": error.to_string() })))
}

/// Malformed or non-JSON bodies answer 400 with the same `{error}` shape.
pub(crate) fn rejected_body(rejection: JsonRejection) -> ApiResponse {
    tracing::warn!(target: "strudel::gateway", "rejected request body: {}", rejection.body_text());
    bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
}

/// GET /health – liveness check.
pub(crate) async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Strudel server is running"
    }))
}
