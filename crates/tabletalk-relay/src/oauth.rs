//! OAuth 2.0 authorization-code grant against Google's endpoints.
//!
//! Only the access token is kept. Refresh tokens are requested
//! (`access_type=offline`) but never used; an expired token fails the next
//! warehouse call and the user signs in again.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{RelayError, Result};
use crate::provider::{AccessToken, TokenExchanger};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only warehouse scope requested at consent time.
pub const BIGQUERY_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";

/// Client registration and endpoints for one OAuth provider.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with the provider.
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Google endpoints with the read-only warehouse scope.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            auth_url: GOOGLE_AUTH_URL.to_owned(),
            token_url: GOOGLE_TOKEN_URL.to_owned(),
            scopes: vec![BIGQUERY_READONLY_SCOPE.to_owned()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// [`TokenExchanger`] for a standard OAuth 2.0 provider.
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
    authorize_url: Url,
}

impl OAuthClient {
    /// Fails when `config.auth_url` is not a valid URL.
    pub fn new(http: reqwest::Client, config: OAuthConfig) -> Result<Self> {
        let authorize_url = Url::parse_with_params(
            &config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_url.as_str()),
                ("scope", config.scopes.join(" ").as_str()),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(Self {
            http,
            config,
            authorize_url,
        })
    }
}

#[async_trait]
impl TokenExchanger for OAuthClient {
    fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut().append_pair("state", state);
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(RelayError::upstream("oauth", status, &text));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        if token.access_token.is_empty() {
            return Err(RelayError::InvalidResponse(
                "token endpoint returned an empty access_token".into(),
            ));
        }
        debug!(
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            expires_in = ?token.expires_in,
            "authorization code exchanged"
        );
        Ok(AccessToken::new(token.access_token))
    }
}
