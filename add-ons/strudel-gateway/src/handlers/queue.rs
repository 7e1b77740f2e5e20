//! Queue variant: the page submits prompts, an external agent polls them.

use super::{bad_request, rejected_body, ApiResponse};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    prompt: Option<String>,
}

/// POST /prompt – enqueue a prompt from the web page.
pub(crate) async fn submit_prompt(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResponse {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected_body(rejection),
    };
    match state.queue.submit(body.prompt.as_deref().unwrap_or("")).await {
        Ok(queue_length) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Prompt received",
                "queueLength": queue_length
            })),
        ),
        Err(e) => bad_request(e),
    }
}

/// GET /get-prompt – pop the oldest prompt for the polling agent.
pub(crate) async fn next_prompt(State(state): State<AppState>) -> Json<Value> {
    match state.queue.poll().await {
        Some(entry) => Json(json!({
            "hasPrompt": true,
            "prompt": entry.prompt,
            "timestamp": entry.timestamp
        })),
        None => Json(json!({ "hasPrompt": false })),
    }
}
