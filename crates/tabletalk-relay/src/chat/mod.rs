//! Chat-model adapters.
//!
//! [`ChatProvider`] selects the wire format; [`create_chat_model`] builds the
//! matching [`ChatModel`] from a [`ChatSettings`].

pub mod gemini;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use gemini::GeminiChat;
pub use openai::OpenAiChat;

use crate::provider::ChatModel;

/// Supported chat-completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatProvider {
    /// Google Generative Language API (`generateContent`).
    #[default]
    Gemini,
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint.
    OpenAi,
}

impl ChatProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => gemini::GEMINI_BASE_URL,
            Self::OpenAi => openai::OPENAI_BASE_URL,
        }
    }
}

impl FromStr for ChatProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            _ => Err(format!("unknown chat provider: {s}")),
        }
    }
}

impl fmt::Display for ChatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider choice plus credentials.
#[derive(Clone)]
pub struct ChatSettings {
    pub provider: ChatProvider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl ChatSettings {
    /// Settings with the provider's default model and endpoint.
    pub fn new(provider: ChatProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_owned(),
            base_url: provider.default_base_url().to_owned(),
        }
    }
}

/// Build the adapter for `settings.provider`.
pub fn create_chat_model(http: reqwest::Client, settings: ChatSettings) -> Arc<dyn ChatModel> {
    match settings.provider {
        ChatProvider::Gemini => Arc::new(GeminiChat::new(
            http,
            settings.api_key,
            settings.model,
            settings.base_url,
        )),
        ChatProvider::OpenAi => Arc::new(OpenAiChat::new(
            http,
            settings.api_key,
            settings.model,
            settings.base_url,
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn provider_from_str() {
        assert_eq!("gemini".parse::<ChatProvider>().unwrap(), ChatProvider::Gemini);
        assert_eq!("Google".parse::<ChatProvider>().unwrap(), ChatProvider::Gemini);
        assert_eq!(" OpenAI ".parse::<ChatProvider>().unwrap(), ChatProvider::OpenAi);
        assert!("palm".parse::<ChatProvider>().is_err());
    }

    #[test]
    fn settings_use_provider_defaults() {
        let settings = ChatSettings::new(ChatProvider::OpenAi, "k");
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.base_url, openai::OPENAI_BASE_URL);
    }

    #[test]
    fn factory_labels_adapter() {
        let model = create_chat_model(
            reqwest::Client::new(),
            ChatSettings::new(ChatProvider::Gemini, "k"),
        );
        assert_eq!(model.label(), "gemini/gemini-1.5-flash");
    }
}
