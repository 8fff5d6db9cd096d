//! Chat relay: wrap the user's message in the table preamble and return
//! the model's reply as plain text.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tabletalk_relay::prompt::{build_prompt, system_preamble};
use tabletalk_relay::ChatTurn;
use tracing::{debug, info};
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::schemas::ChatRequest;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat), components(schemas(ChatRequest)))]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Send one message to the chat model (`POST /chat`).
///
/// Each request is a fresh conversation; nothing is remembered between
/// messages.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply", body = String, content_type = "text/plain"),
        (status = 400, description = "Empty or oversized message"),
        (status = 502, description = "Model error or blocked reply"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ServerError::BadRequest("message must not be blank".into()));
    }

    let preamble = system_preamble(&state.config.table, &state.config.fields);
    let turn = ChatTurn::new(build_prompt(&preamble, message));
    debug!(model = state.chat.label(), prompt_len = turn.prompt.len(), "sending chat turn");

    let reply = state.chat.send(&turn).await?;
    info!(model = state.chat.label(), reply_len = reply.len(), "chat reply received");

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], reply).into_response())
}
