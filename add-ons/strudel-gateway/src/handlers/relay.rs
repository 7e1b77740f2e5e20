//! `POST /api/prompt`: synchronous relay to the completion provider.

use super::{bad_request, rejected_body, ApiResponse};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use strudel_core::{PromptRequest, RelayError, RelayResponse};

pub(crate) async fn api_prompt(
    State(state): State<AppState>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected_body(rejection),
    };
    let prompt = body.prompt.unwrap_or_default();
    let code = body.code.unwrap_or_default();

    match state.relay.relay(&prompt, &code).await {
        Ok(text) => (StatusCode::OK, Json(json!(RelayResponse::ok(text)))),
        Err(e @ RelayError::InvalidInput(_)) => bad_request(e),
        Err(RelayError::Rejected(reason)) => (
            StatusCode::OK,
            Json(json!(RelayResponse::failed("Invalid Strudel code generated", reason))),
        ),
        Err(e) => {
            tracing::error!(
                target: "strudel::gateway",
                provider = state.relay.provider_name(),
                "relay failed: {}",
                e
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to call AI endpoint",
                    "details": e.to_string()
                })),
            )
        }
    }
}
