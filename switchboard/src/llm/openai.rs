//! OpenAI Chat Completions gateway implementing `LlmGateway`.
//!
//! Uses `OPENAI_API_KEY` from the environment by default. Model selection
//! per turn: explicit override, else `OPENAI_MODEL`, else the default.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

use super::{LlmError, LlmGateway, LlmRequest};

/// Fallback model when neither the turn nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Resolves the model for a turn: explicit override > `OPENAI_MODEL` > default.
pub fn select_model(explicit: Option<&str>) -> String {
    if let Some(m) = explicit {
        if !m.is_empty() {
            return m.to_string();
        }
    }
    std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string())
}

/// Chat Completions client behind the `LlmGateway` trait.
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGateway {
    /// Client with default config (API key from `OPENAI_API_KEY`).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
        }
    }

    /// Client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = request
            .system
            .iter()
            .map(|s| {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage::from(
                    s.as_str(),
                ))
            })
            .collect();
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage::from(request.user.as_str()),
        ));

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(messages);
        if let Some(t) = request.temperature {
            args.temperature(t);
        }
        let req = args
            .build()
            .map_err(|e| LlmError::Request(format!("request build failed: {}", e)))?;

        debug!(model = %self.model, temperature = ?request.temperature, "chat create");
        let response = self
            .client
            .chat()
            .create(req)
            .await
            .map_err(|e| LlmError::Request(format!("OpenAI API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Request("OpenAI returned no choices".into()))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}
