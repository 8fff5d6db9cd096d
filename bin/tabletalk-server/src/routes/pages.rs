//! Landing page and the embedded front-end script.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;

use crate::error::ServerError;
use crate::routes::auth::sign_in_url;
use crate::session::UserSession;
use crate::state::AppState;

const MAIN_JS: &str = include_str!("../../static/main.js");

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/static/main.js", get(main_js))
}

/// `GET /`: sign-in link while signed out, chat box once a token is held.
async fn index(
    State(state): State<Arc<AppState>>,
    session: UserSession,
) -> Result<Html<String>, ServerError> {
    let authenticated = session.access_token().await?.is_some();
    let auth_url = if authenticated {
        String::new()
    } else {
        sign_in_url(&state, &session).await?
    };
    let page = state
        .views
        .index(&state.config.table, authenticated, &auth_url)?;
    Ok(Html(page))
}

async fn main_js() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/javascript; charset=utf-8")], MAIN_JS)
}
