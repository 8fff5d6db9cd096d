//! Unified server error type.
//!
//! Every fallible handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a JSON-body
//! HTTP response with an appropriate status code.
//!
//! Upstream and internal errors are logged with full detail; clients only
//! get a generic message so tokens, SQL, and provider responses never leak.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tabletalk_relay::RelayError;
use thiserror::Error;
use tracing::error;

use crate::session::SessionError;

/// All errors that can occur in the tabletalk-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An OAuth, warehouse, or chat call failed.
    #[error("upstream error: {0}")]
    Relay(#[from] RelayError),

    /// The session store could not be read or written.
    #[error("session store error: {0}")]
    Session(#[from] SessionError),

    /// A page template failed to render.
    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),

            // The user's own SQL selected columns that do not line up with
            // the configured fields.
            ServerError::Relay(e @ RelayError::SchemaMismatch { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ServerError::Relay(RelayError::Blocked(reason)) => {
                error!(reason = %reason, "chat reply blocked");
                (
                    StatusCode::BAD_GATEWAY,
                    "the chat model declined to answer this message".to_owned(),
                )
            }
            ServerError::Relay(e) => {
                error!(error = %e, "upstream service error");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream service error".to_owned(),
                )
            }
            ServerError::Session(e) => {
                error!(error = %e, "session store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Render(e) => {
                error!(error = %e, "template render error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}
