//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use tabletalk_relay::{ChatModel, TokenExchanger, Warehouse};

use crate::config::Config;
use crate::session::MemorySessionStore;
use crate::views::Views;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Backing store for the session layer; cheap to clone.
    pub sessions: MemorySessionStore,
    /// Compiled page templates.
    pub views: Arc<Views>,
    pub oauth: Arc<dyn TokenExchanger>,
    pub warehouse: Arc<dyn Warehouse>,
    pub chat: Arc<dyn ChatModel>,
}
