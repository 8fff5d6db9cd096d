//! Server configuration, loaded from environment variables at startup.
//!
//! Credentials and table identifiers are required; everything else has a
//! default. `main` loads a `.env` file first when one is present.

use anyhow::{anyhow, bail, Result};
use tabletalk_relay::chat::{ChatProvider, ChatSettings};
use tabletalk_relay::oauth::OAuthConfig;
use tabletalk_relay::warehouse::{BIGQUERY_BASE_URL, DEFAULT_LOCATION};
use tabletalk_relay::{FieldList, TableRef};
use time::Duration;

/// Runtime configuration for tabletalk-server.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated allowed CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Key for signing the session-id cookie.
    pub session_secret: String,

    /// Add the `Secure` attribute to the session cookie (HTTPS deployments).
    pub secure_cookie: bool,

    /// A session unused for this long is dropped (default: 60 minutes).
    pub session_idle: Duration,

    pub oauth: OAuthConfig,

    /// The one table queries and the chat preamble are scoped to.
    pub table: TableRef,

    /// Field names bound to result positions.
    pub fields: FieldList,

    /// Query processing location (default: `"US"`).
    pub query_location: String,

    /// Warehouse REST API root.
    pub warehouse_base_url: String,

    pub chat: ChatSettings,
}

impl Config {
    /// Build [`Config`] from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow!("required environment variable {key} is not set"))
        };
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_owned());
        let flag = |key: &str| {
            var(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };

        let mut oauth = OAuthConfig::google(
            required("CLIENT_ID")?,
            required("CLIENT_SECRET")?,
            required("CALLBACK_URL")?,
        );
        if let Some(url) = var("OAUTH_AUTH_URL") {
            oauth.auth_url = url;
        }
        if let Some(url) = var("OAUTH_TOKEN_URL") {
            oauth.token_url = url;
        }

        let fields = match var("TABLE_FIELDS") {
            Some(list) => FieldList::parse(&list)
                .ok_or_else(|| anyhow!("TABLE_FIELDS must name at least one field"))?,
            None => FieldList::default(),
        };

        let provider: ChatProvider = match var("CHAT_PROVIDER") {
            Some(p) => p.parse().map_err(|e: String| anyhow!(e))?,
            None => ChatProvider::default(),
        };
        let mut chat = ChatSettings::new(provider, required("CHAT_API_KEY")?);
        if let Some(model) = var("CHAT_MODEL") {
            chat.model = model;
        }
        if let Some(url) = var("CHAT_BASE_URL") {
            chat.base_url = url;
        }

        let session_idle = match var("TABLETALK_SESSION_IDLE_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => Duration::minutes(minutes),
                _ => bail!("TABLETALK_SESSION_IDLE_MINUTES must be a positive number of minutes"),
            },
            None => Duration::minutes(60),
        };

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < 16 {
            bail!("SESSION_SECRET must be at least 16 characters");
        }

        Ok(Self {
            bind_address: or("TABLETALK_BIND", "0.0.0.0:8080"),
            log_level: or("TABLETALK_LOG", "info"),
            log_json: flag("TABLETALK_LOG_JSON"),
            cors_allowed_origins: var("TABLETALK_CORS_ORIGINS"),
            session_secret,
            secure_cookie: flag("TABLETALK_SECURE_COOKIE"),
            session_idle,
            oauth,
            table: TableRef::new(
                required("PROJECT_ID")?,
                required("DATASET_ID")?,
                required("TABLE_ID")?,
            ),
            fields,
            query_location: or("QUERY_LOCATION", DEFAULT_LOCATION),
            warehouse_base_url: or("WAREHOUSE_BASE_URL", BIGQUERY_BASE_URL),
            chat,
        })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::HashMap;

    /// A complete set of required variables.
    pub(crate) fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("CLIENT_ID", "client-1"),
            ("CLIENT_SECRET", "client-secret"),
            ("CALLBACK_URL", "http://localhost:8080/oauth/callback"),
            ("SESSION_SECRET", "0123456789abcdef0123"),
            ("PROJECT_ID", "acme-prod"),
            ("DATASET_ID", "crm"),
            ("TABLE_ID", "people"),
            ("CHAT_API_KEY", "chat-key"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|k| env.get(k).map(|v| (*v).to_owned()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let cfg = load(&base_env()).unwrap();
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.query_location, "US");
        assert_eq!(cfg.fields, FieldList::default());
        assert_eq!(cfg.table.qualified(), "acme-prod.crm.people");
        assert_eq!(cfg.chat.provider, ChatProvider::Gemini);
        assert_eq!(cfg.chat.model, "gemini-1.5-flash");
        assert!(!cfg.log_json);
        assert!(!cfg.secure_cookie);
        assert_eq!(cfg.session_idle, Duration::minutes(60));
    }

    #[test]
    fn session_idle_timeout_is_configurable_and_positive() {
        let mut env = base_env();
        env.insert("TABLETALK_SESSION_IDLE_MINUTES", "15");
        assert_eq!(load(&env).unwrap().session_idle, Duration::minutes(15));

        env.insert("TABLETALK_SESSION_IDLE_MINUTES", "0");
        assert!(load(&env).is_err());
        env.insert("TABLETALK_SESSION_IDLE_MINUTES", "soon");
        assert!(load(&env).is_err());
    }

    #[test]
    fn missing_required_var_is_named_in_error() {
        let mut env = base_env();
        env.remove("TABLE_ID");
        let err = load(&env).err().unwrap();
        assert!(err.to_string().contains("TABLE_ID"));
    }

    #[test]
    fn blank_required_var_counts_as_missing() {
        let mut env = base_env();
        env.insert("CLIENT_SECRET", "   ");
        assert!(load(&env).is_err());
    }

    #[test]
    fn overrides_are_honoured() {
        let mut env = base_env();
        env.insert("CHAT_PROVIDER", "openai");
        env.insert("CHAT_MODEL", "gpt-4o");
        env.insert("TABLE_FIELDS", "id,name");
        env.insert("QUERY_LOCATION", "EU");
        env.insert("TABLETALK_LOG_JSON", "true");
        let cfg = load(&env).unwrap();
        assert_eq!(cfg.chat.provider, ChatProvider::OpenAi);
        assert_eq!(cfg.chat.model, "gpt-4o");
        assert_eq!(cfg.fields.names(), &["id", "name"]);
        assert_eq!(cfg.query_location, "EU");
        assert!(cfg.log_json);
    }

    #[test]
    fn unknown_chat_provider_is_rejected() {
        let mut env = base_env();
        env.insert("CHAT_PROVIDER", "palm");
        assert!(load(&env).is_err());
    }

    #[test]
    fn short_session_secret_is_rejected() {
        let mut env = base_env();
        env.insert("SESSION_SECRET", "short");
        assert!(load(&env).is_err());
    }
}
