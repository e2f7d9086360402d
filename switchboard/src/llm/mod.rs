//! LLM gateway: model selection per turn, prompt execution returning free
//! text or a schema-validated JSON object.
//!
//! Every node that parses JSON strips markdown code fences, locates the
//! outermost object with a greedy `{ ... }` match, validates against its
//! schema type, and falls back deterministically on failure. No partial
//! parse recovery.

mod mock;
mod openai;

pub use mock::ScriptedLlm;
pub use openai::{select_model, OpenAiGateway, DEFAULT_MODEL};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(String),

    #[error("llm returned unparseable output: {0}")]
    Parse(String),
}

/// One prompt execution: system context lines plus the user prompt.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system: Vec<String>,
    pub user: String,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, line: impl Into<String>) -> Self {
        self.system.push(line.into());
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }
}

/// Prompt execution behind a trait so tests can script responses.
///
/// **Interaction**: Implemented by `OpenAiGateway` (async-openai) and
/// `ScriptedLlm` (tests); consumed by every workflow node that thinks.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError>;
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\s*\n([\s\S]*?)\n```").expect("static regex"));
static FENCED_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```\s*\n([\s\S]*?)\n```").expect("static regex"));
static OUTER_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("static regex"));

/// Extracts the outermost JSON object from LLM output: fenced ```json block
/// first, then any fenced block, then a greedy `{ ... }` match.
pub fn extract_json_object(text: &str) -> Option<String> {
    let mut text = text.trim().to_string();
    if text.contains("```json") {
        if let Some(m) = FENCED_JSON.captures(&text) {
            text = m[1].trim().to_string();
        }
    } else if text.contains("```") {
        if let Some(m) = FENCED_ANY.captures(&text) {
            text = m[1].trim().to_string();
        }
    }
    OUTER_OBJECT.find(&text).map(|m| m.as_str().to_string())
}

/// Runs the prompt and parses the reply into `T`. `Err(LlmError::Parse)` on
/// schema mismatch; callers apply their documented fallback.
pub async fn complete_json<T: DeserializeOwned>(
    llm: &dyn LlmGateway,
    request: LlmRequest,
) -> Result<T, LlmError> {
    let raw = llm.complete(request).await?;
    let json = extract_json_object(&raw)
        .ok_or_else(|| LlmError::Parse(format!("no JSON object in: {}", truncate(&raw, 200))))?;
    serde_json::from_str(&json).map_err(|e| LlmError::Parse(e.to_string()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
