//! tabletalk-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` and parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Build the OAuth, warehouse and chat adapters over one HTTP client.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod session;
mod state;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;

use tabletalk_relay::chat::create_chat_model;
use tabletalk_relay::oauth::OAuthClient;
use tabletalk_relay::warehouse::BigQueryRest;
use tower_sessions::session_store::ExpiredDeletion;
use tracing::{info, warn};

use crate::config::Config;
use crate::session::MemorySessionStore;
use crate::state::AppState;
use crate::views::Views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let dotenv = dotenvy::dotenv();
    let cfg = Config::from_env()?;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: TABLETALK_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "tabletalk-server starting");
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to load .env"),
    }

    // ── 3. Upstream adapters ───────────────────────────────────────────────────
    let http = reqwest::Client::builder()
        .user_agent(concat!("tabletalk-server/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let oauth = OAuthClient::new(http.clone(), cfg.oauth.clone())?;
    let warehouse = BigQueryRest::new(http.clone(), cfg.table.project.clone(), cfg.fields.clone())
        .with_base_url(cfg.warehouse_base_url.clone())
        .with_location(cfg.query_location.clone());
    let chat = create_chat_model(http, cfg.chat.clone());
    info!(
        table = %cfg.table.qualified(),
        fields = %cfg.fields.joined(),
        model = chat.label(),
        "upstream adapters ready"
    );

    // ── 4. Shared application state ────────────────────────────────────────────
    let sessions = MemorySessionStore::new();
    tokio::spawn(sweep_expired_sessions(sessions.clone(), cfg.session_idle));
    info!(idle_timeout = %cfg.session_idle, "session store ready");

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        sessions,
        views: Arc::new(Views::new()?),
        oauth: Arc::new(oauth),
        warehouse: Arc::new(warehouse),
        chat,
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tabletalk-server stopped");
    Ok(())
}

/// Drop expired sessions from the store every `period`.
async fn sweep_expired_sessions(store: MemorySessionStore, period: time::Duration) {
    let period = std::time::Duration::try_from(period).unwrap_or(std::time::Duration::from_secs(3600));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Err(e) = store.delete_expired().await {
            warn!(error = %e, "failed to delete expired sessions");
        }
    }
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
