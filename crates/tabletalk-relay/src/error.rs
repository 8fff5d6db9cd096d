use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the relay adapters.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream service answered with a non-2xx status.
    #[error("{service} returned HTTP {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The upstream body was valid JSON but not the shape we expect.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A result row does not have one value per configured field.
    #[error("row has {actual} values but {expected} fields are configured")]
    SchemaMismatch { expected: usize, actual: usize },

    /// The chat model refused to answer under the content-safety policy.
    #[error("response blocked by content-safety policy: {0}")]
    Blocked(String),

    /// A configured endpoint is not a valid URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to deserialize an upstream body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Longest slice of a non-JSON error body kept in an [`RelayError::Upstream`].
const MAX_ERROR_BODY: usize = 256;

// Google and OpenAI-style APIs nest `{"error": {"message": ...}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// The OAuth token endpoint uses a flat `{"error": "...", "error_description": "..."}`.
#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

impl RelayError {
    /// Build an [`RelayError::Upstream`] from a failed response, pulling the
    /// human-readable message out of the common JSON error envelopes.
    pub fn upstream(service: &'static str, status: reqwest::StatusCode, body: &str) -> Self {
        let message = if let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(body) {
            match oauth.error_description {
                Some(desc) => format!("{}: {desc}", oauth.error),
                None => oauth.error,
            }
        } else if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
            envelope.error.message
        } else {
            truncate(body.trim(), MAX_ERROR_BODY).to_owned()
        };

        RelayError::Upstream {
            service,
            status: status.as_u16(),
            message,
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
