//! Chat agent: persona-aware general conversation. Also the fallback target
//! of the alias table.

use std::sync::Arc;

use async_trait::async_trait;

use crate::base::datetime_context;
use crate::error::OrchestratorError;
use crate::llm::{LlmGateway, LlmRequest};
use crate::state::{ChatMessage, Role, TurnMetadata};

use super::{Agent, AgentReply, CHAT_AGENT};

/// Messages of history carried into the prompt.
const HISTORY_WINDOW: usize = 12;

pub struct ChatAgent {
    pub llm: Arc<dyn LlmGateway>,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }

    fn persona_line(metadata: &TurnMetadata) -> String {
        let p = &metadata.persona;
        format!(
            "You are {}, a helpful assistant. Style: {}. Keep a {} perspective.",
            p.ai_name, p.persona_style, p.political_bias
        )
    }

    fn history_block(history: &[ChatMessage]) -> String {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        history[start..]
            .iter()
            .map(|m| {
                let who = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                format!("{}: {}", who, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        CHAT_AGENT
    }

    async fn process(
        &self,
        query: &str,
        metadata: &TurnMetadata,
        history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        let mut request = LlmRequest::new(query)
            .with_system(Self::persona_line(metadata))
            .with_system(datetime_context(&metadata.persona.timezone));
        if !history.is_empty() {
            request = request.with_system(format!(
                "Conversation so far:\n{}",
                Self::history_block(history)
            ));
        }
        let response = self.llm.complete(request).await?;
        Ok(AgentReply::complete(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;

    /// **Scenario**: the chat agent answers with the persona and history in
    /// the system context.
    #[tokio::test]
    async fn chat_includes_persona_and_history() {
        let llm = Arc::new(ScriptedLlm::always("hello there"));
        let agent = ChatAgent::new(llm);
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hey")];
        let reply = agent
            .process("how are you?", &TurnMetadata::default(), &history)
            .await
            .unwrap();
        assert_eq!(reply.response, "hello there");
        assert_eq!(reply.task_status, crate::state::TaskStatus::Complete);
    }
}
