//! Provider interfaces used by the request handlers.
//!
//! Each trait is the whole surface a handler needs from one upstream
//! service. Adapters implement them; tests substitute in-process fakes.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;
use crate::prompt::ChatTurn;
use crate::row::Row;

/// OAuth bearer credential. `Debug` never prints the secret.
///
/// Serializable so it can sit in server-side session storage; it is never
/// sent to the browser.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for an `Authorization: Bearer` header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Exchange an authorization code for an access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Consent-page URL the browser is sent to, carrying the anti-forgery
    /// `state` the callback must echo back.
    fn authorize_url(&self, state: &str) -> Url;

    /// Authorization-code grant.
    async fn exchange_code(&self, code: &str) -> Result<AccessToken>;
}

/// Run SQL against the fixed table, get rows.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Forward `sql` verbatim using `token` and reshape the result.
    async fn run_query(&self, token: &AccessToken, sql: &str) -> Result<Vec<Row>>;
}

/// Send one chat turn, get the model's text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Short provider/model label for logs.
    fn label(&self) -> &str;

    /// Send `turn` with an empty history and return the raw reply.
    async fn send(&self, turn: &ChatTurn) -> Result<String>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("ya29.secret");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
        assert_eq!(token.secret(), "ya29.secret");
    }
}
