//! OpenAI-compatible `/v1/chat/completions`.
//!
//! There is no request field for the safety policy; the provider's own
//! moderation applies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::prompt::ChatTurn;
use crate::provider::ChatModel;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`ChatModel`] for OpenAI-compatible servers.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    label: String,
}

impl OpenAiChat {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            http,
            api_key: api_key.into(),
            label: format!("openai/{model}"),
            model,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn label(&self) -> &str {
        &self.label
    }

    async fn send(&self, turn: &ChatTurn) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: &turn.prompt,
            }],
            temperature: turn.params.temperature,
            top_p: turn.params.top_p,
            max_tokens: turn.params.max_output_tokens,
            stream: false,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(%status, model = %self.model, "chat completion failed");
            return Err(RelayError::upstream("openai", status, &text));
        }

        let body: CompletionResponse = serde_json::from_str(&text)?;
        let reply = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RelayError::InvalidResponse("no choices in completion".into()))?;
        debug!(model = %self.model, reply_len = reply.len(), "chat completion finished");
        Ok(reply)
    }
}
