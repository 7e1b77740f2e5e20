//! `GET /code` and `POST /update`: direct access to the code buffer.

use super::{bad_request, rejected_body, ApiResponse};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub(crate) struct UpdateRequest {
    #[serde(default)]
    code: Option<String>,
}

/// GET /code – current buffer.
pub(crate) async fn get_code(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "code": state.store.get().await }))
}

/// POST /update – overwrite the buffer with the posted code.
pub(crate) async fn update_code(
    State(state): State<AppState>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected_body(rejection),
    };
    let code = match state.store.set(body.code.unwrap_or_default()).await {
        Ok(code) => code,
        Err(e) => return bad_request(e),
    };

    tracing::info!(target: "strudel::gateway", chars = code.len(), "code updated");
    tracing::debug!(target: "strudel::gateway", "new code:\n{}\n{}\n{}", "-".repeat(50), code, "-".repeat(50));

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Code updated successfully",
            "code": code
        })),
    )
}
