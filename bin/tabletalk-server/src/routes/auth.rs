//! OAuth consent link, redirect target and logout.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ServerError;
use crate::session::UserSession;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/oauth/callback", get(oauth_callback))
        .route("/logout", get(logout))
}

/// Consent URL for this session.
///
/// The `state` it carries is stored in the session and reused until a
/// callback consumes it, so several open tabs share one value.
pub(crate) async fn sign_in_url(
    state: &AppState,
    session: &UserSession,
) -> Result<String, ServerError> {
    let mut nonce = String::new();
    session
        .update(|data| {
            nonce = data
                .oauth_state
                .get_or_insert_with(|| Uuid::new_v4().simple().to_string())
                .clone();
        })
        .await?;
    Ok(state.oauth.authorize_url(&nonce).to_string())
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    /// Set by the provider when the user denies consent.
    error: Option<String>,
    state: Option<String>,
}

/// `GET /oauth/callback?code=...&state=...`
///
/// The code is only exchanged when `state` matches the value this session
/// was sent out with. Every failure is logged and the user is left signed
/// out; the response is a redirect to `/` either way.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    session: UserSession,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ServerError> {
    let mut data = session.get().await?;
    let Some(expected) = data.oauth_state.take() else {
        warn!("oauth callback for a session that never started sign-in");
        return Ok(Redirect::to("/"));
    };

    match (params.code, params.error) {
        (_, Some(reason)) => warn!(%reason, "authorization was not granted"),
        (None, None) => warn!("oauth callback without a code"),
        (Some(_), None) if params.state.as_deref() != Some(expected.as_str()) => {
            warn!("oauth callback state does not match this session");
        }
        (Some(code), None) => match state.oauth.exchange_code(&code).await {
            Ok(token) => {
                data.access_token = Some(token);
                info!(session = ?session.id(), "access token stored");
            }
            Err(e) => error!(error = %e, "error retrieving access token"),
        },
    }

    session.set(data).await?;
    Ok(Redirect::to("/"))
}

/// `GET /logout`: drop the session; the session layer expires the cookie.
async fn logout(session: UserSession) -> Response {
    let id = session.id();
    match session.destroy().await {
        Ok(()) => {
            info!(session = ?id, "session destroyed");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!(error = %e, "error destroying session");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error clearing session").into_response()
        }
    }
}
