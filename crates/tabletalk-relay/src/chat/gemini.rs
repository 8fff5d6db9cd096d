//! Google Generative Language API (`models/{model}:generateContent`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::prompt::ChatTurn;
use crate::provider::ChatModel;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// [`ChatModel`] for Gemini models.
pub struct GeminiChat {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    label: String,
}

impl GeminiChat {
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
            label: format!("gemini/{model}"),
            model,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

fn request_body(turn: &ChatTurn) -> GenerateRequest<'_> {
    GenerateRequest {
        // Single user turn; no history is carried between requests.
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: &turn.prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: turn.params.temperature,
            top_k: turn.params.top_k,
            top_p: turn.params.top_p,
            max_output_tokens: turn.params.max_output_tokens,
        },
        safety_settings: turn
            .safety
            .rules
            .iter()
            .map(|(category, threshold)| SafetySetting {
                category: category.as_str(),
                threshold: threshold.as_str(),
            })
            .collect(),
    }
}

fn extract_text(body: GenerateResponse) -> Result<String> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        let reason = body
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_owned());
        return Err(RelayError::Blocked(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some("SAFETY") => Err(RelayError::Blocked("SAFETY".into())),
            reason => Err(RelayError::InvalidResponse(format!(
                "candidate has no text (finish reason: {})",
                reason.unwrap_or("none")
            ))),
        };
    }
    Ok(text)
}

#[async_trait]
impl ChatModel for GeminiChat {
    fn label(&self) -> &str {
        &self.label
    }

    async fn send(&self, turn: &ChatTurn) -> Result<String> {
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(turn))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(%status, model = %self.model, "generateContent failed");
            return Err(RelayError::upstream("gemini", status, &text));
        }

        let reply = extract_text(serde_json::from_str(&text)?)?;
        debug!(model = %self.model, reply_len = reply.len(), "generateContent finished");
        Ok(reply)
    }
}
