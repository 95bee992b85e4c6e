//! Assistant chat endpoint
//!
//! Endpoints:
//! - POST /api/chat
//!
//! Answers `200 {response}`, `400 {error}` for a missing or blank message,
//! and `500 {error, details, timestamp}` when the body is not JSON or
//! generation fails. The body is read raw so no extractor rejection escapes
//! this shape. Every response carries `Cache-Control: no-cache`.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::ApiState;

pub fn routes() -> Router<ApiState> {
    Router::new().route("/api/chat", post(chat))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

impl ChatRequest {
    /// Non-blank string message, if any
    fn message(self) -> Option<String> {
        match self.message? {
            serde_json::Value::String(m) if !m.trim().is_empty() => Some(m),
            _ => None,
        }
    }
}

/// An empty body counts as a request without a message
fn parse_request(body: &[u8]) -> Result<ChatRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ChatRequest { message: None });
    }
    serde_json::from_slice(body)
}

#[derive(Serialize)]
struct ChatReply {
    response: String,
}

#[derive(Serialize)]
struct ChatRejected {
    error: &'static str,
}

#[derive(Serialize)]
struct ChatFailed {
    error: &'static str,
    details: String,
    timestamp: String,
}

pub fn chat_prompt(message: &str) -> String {
    format!("You are a helpful AI assistant. Please respond to the following: {message}")
}

fn no_cache(status: StatusCode, body: impl Serialize) -> Response {
    (status, [(header::CACHE_CONTROL, "no-cache")], Json(body)).into_response()
}

async fn chat(State(state): State<ApiState>, body: Bytes) -> Response {
    let req = match parse_request(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "unparseable chat request");
            return failed(format!("invalid JSON body: {e}"));
        }
    };
    let Some(message) = req.message() else {
        debug!("chat request without a message");
        return no_cache(
            StatusCode::BAD_REQUEST,
            ChatRejected {
                error: "Message is required",
            },
        );
    };

    match state.generator.generate(&chat_prompt(&message)).await {
        Ok(text) if !text.trim().is_empty() => {
            no_cache(StatusCode::OK, ChatReply { response: text })
        }
        Ok(_) => {
            warn!(generator = state.generator.name(), "empty chat response");
            failed("Empty response from generator".to_string())
        }
        Err(e) => {
            error!(generator = state.generator.name(), error = %e, "chat generation failed");
            failed(e.to_string())
        }
    }
}

fn failed(details: String) -> Response {
    no_cache(
        StatusCode::INTERNAL_SERVER_ERROR,
        ChatFailed {
            error: "Failed to process request",
            details,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    )
}
