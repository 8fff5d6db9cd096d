//! Prompt construction for the SQL assistant.
//!
//! Every chat message is sent as `preamble + message`. The preamble pins the
//! model to one table and its allowed fields; this is advisory only, nothing
//! checks the SQL the model writes.

use crate::row::{FieldList, TableRef};

/// System preamble template for the SQL assistant.
const PREAMBLE_TEMPLATE: &str = r#"You are a SQL assistant for a single BigQuery table. Write GoogleSQL (standard SQL) queries that answer the user's question.

TABLE:
{table}

ALLOWED FIELDS:
{fields}

INSTRUCTIONS:
- Query only the table above and always write it exactly as {table}
- Select only the allowed fields, in the order listed; never use SELECT *
- Wrap every SQL query in ```sql code blocks
- If the question cannot be answered from this table, say so and do not write SQL"#;

/// Builds the preamble naming `table` and the allow-listed `fields`.
pub fn system_preamble(table: &TableRef, fields: &FieldList) -> String {
    PREAMBLE_TEMPLATE
        .replace("{table}", &table.to_string())
        .replace("{fields}", &fields.joined())
}

/// Concatenate the preamble and the user's message into one prompt.
pub fn build_prompt(preamble: &str, message: &str) -> String {
    format!("{preamble}\n\nUSER REQUEST:\n{message}")
}

/// Fixed sampling parameters sent with every turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: 512,
        }
    }
}

/// Harm categories understood by the safety filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    SexuallyExplicit,
    DangerousContent,
}

impl HarmCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Harassment => "HARM_CATEGORY_HARASSMENT",
            Self::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
            Self::SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            Self::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
        }
    }
}

/// Lowest probability at which content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockThreshold {
    LowAndAbove,
    MediumAndAbove,
    OnlyHigh,
    None,
}

impl BlockThreshold {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowAndAbove => "BLOCK_LOW_AND_ABOVE",
            Self::MediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            Self::OnlyHigh => "BLOCK_ONLY_HIGH",
            Self::None => "BLOCK_NONE",
        }
    }
}

/// Content-safety rules attached to a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyPolicy {
    pub rules: Vec<(HarmCategory, BlockThreshold)>,
}

/// Block medium-and-above in all four categories.
impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            rules: [
                HarmCategory::Harassment,
                HarmCategory::HateSpeech,
                HarmCategory::SexuallyExplicit,
                HarmCategory::DangerousContent,
            ]
            .into_iter()
            .map(|c| (c, BlockThreshold::MediumAndAbove))
            .collect(),
        }
    }
}

/// Everything a [`ChatModel`](crate::ChatModel) needs for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub prompt: String,
    pub params: GenerationParams,
    pub safety: SafetyPolicy,
}

impl ChatTurn {
    /// A turn with the default parameters and safety policy.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            params: GenerationParams::default(),
            safety: SafetyPolicy::default(),
        }
    }
}
