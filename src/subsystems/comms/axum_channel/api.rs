//! Axum handlers for `/chat` and `/api/*`.
//!
//! Each handler receives [`AxumState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Question handlers run under a timeout.

use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::AxumState;
use crate::qa::prompt::TONE_GUIDE;
use crate::subsystems::comms::state::{CommsEvent, TONES, resolve_tone};

const ANSWER_TIMEOUT: Duration = Duration::from_secs(120);

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    message: String,
}

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
    tone: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn chat_error(msg: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": format!("Error processing question: {msg}") })),
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /chat: service endpoint, answers in the house tone.
pub(super) async fn chat(
    State(state): State<AxumState>,
    Json(req): Json<ChatRequest>,
) -> Response {
    state.comms.report_event(CommsEvent::SessionStarted { channel_id: state.channel_id.to_string() });
    match tokio::time::timeout(
        ANSWER_TIMEOUT,
        state.comms.ask(&state.channel_id, &req.message, TONE_GUIDE),
    )
    .await
    {
        Ok(Ok(answer)) => (
            StatusCode::OK,
            Json(json!({ "status": "success", "message": answer.answer })),
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "chat request failed: {e}");
            chat_error(e)
        }
        Err(_) => {
            warn!(channel_id = %state.channel_id, "chat request timed out");
            chat_error("request timed out")
        }
    }
}

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let (llm, graph) = state.comms.backends();
    (StatusCode::OK, Json(json!({ "status": "ok", "llm": llm, "graph": graph }))).into_response()
}

/// GET /api/tones
pub(super) async fn tones(State(state): State<AxumState>) -> Response {
    Json(json!({ "tones": TONES, "default": state.comms.default_tone() })).into_response()
}

/// POST /api/message: web UI question with an optional tone.
pub(super) async fn message(
    State(state): State<AxumState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    if req.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, json_error("bad_request", "message is empty")).into_response();
    }
    let tone = match req.tone.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        None => state.comms.default_tone().to_string(),
        Some(choice) => match resolve_tone(choice) {
            Some(t) => t.to_string(),
            None => {
                return (StatusCode::BAD_REQUEST, json_error("bad_request", format!("unknown tone: {choice}")))
                    .into_response();
            }
        },
    };

    match tokio::time::timeout(
        ANSWER_TIMEOUT,
        state.comms.ask(&state.channel_id, &req.message, &tone),
    )
    .await
    {
        Ok(Ok(answer)) => {
            (StatusCode::OK, Json(json!({ "reply": answer.answer, "tone": tone }))).into_response()
        }
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "message failed: {e}");
            (StatusCode::BAD_GATEWAY, json_error("internal", e)).into_response()
        }
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            json_error("timeout", "LLM request timed out"),
        )
            .into_response(),
    }
}

/// GET /api/logs
pub(super) async fn logs(State(state): State<AxumState>) -> Response {
    let comms = state.comms.clone();
    match tokio::task::spawn_blocking(move || comms.log_entries()).await {
        Ok(Ok(entries)) => (StatusCode::OK, Json(json!({ "entries": entries }))).into_response(),
        Ok(Err(e)) => {
            warn!(channel_id = %state.channel_id, "log read failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
