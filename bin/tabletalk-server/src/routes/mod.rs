//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (per-request trace id, CORS, signed session cookie)
//! - Landing page and the embedded front-end script
//! - OAuth callback and logout
//! - Query (`/results`) and chat (`/chat`) relays
//! - Health route and the OpenAPI document

mod auth;
mod chat;
pub mod doc;
mod health;
mod pages;
mod results;
#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::middleware::{cors, trace};
use crate::session::{cookie_key, SESSION_COOKIE};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let config = &state.config;
    let sessions = SessionManagerLayer::new(state.sessions.clone())
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(config.session_idle))
        .with_signed(cookie_key(&config.session_secret));

    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(results::router())
        .merge(chat::router())
        .merge(health::router())
        .route("/api-docs/openapi.json", get(doc::openapi_json))
        // Outermost layers execute first on the way in.
        .layer(sessions)
        .layer(cors::cors_layer(&state))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
