//! Data-formatting agent: restructures a prose answer into tables, lists,
//! and sections when the content is data-shaped.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::llm::{LlmGateway, LlmRequest};
use crate::state::{ChatMessage, TurnMetadata};

use super::{Agent, AgentReply};

pub const FORMATTING_AGENT: &str = "data_formatting_agent";

/// Prompt used both by this agent and by the research `format_data` node.
pub fn formatting_prompt(query: &str, content: &str) -> String {
    format!(
        r#"Restructure the response below into well-organized, data-oriented formatting.

ORIGINAL QUERY: {query}

RESPONSE TO FORMAT:
{content}

Guidelines:
1. Use markdown tables for comparable rows of data
2. Use numbered or bulleted lists for sequences and enumerations
3. Use section headers to group related material
4. Preserve every fact; change only the presentation
5. Keep citations and links intact

Your formatted response:"#
    )
}

pub struct FormattingAgent {
    pub llm: Arc<dyn LlmGateway>,
}

impl FormattingAgent {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }

    /// Formats content for a query; used by the research workflow's
    /// formatting hand-off.
    pub async fn format_content(
        &self,
        query: &str,
        content: &str,
    ) -> Result<String, OrchestratorError> {
        let request = LlmRequest::new(formatting_prompt(query, content))
            .with_system("You are a data formatting specialist.")
            .with_temperature(0.2);
        Ok(self.llm.complete(request).await?)
    }
}

#[async_trait]
impl Agent for FormattingAgent {
    fn name(&self) -> &str {
        FORMATTING_AGENT
    }

    async fn process(
        &self,
        query: &str,
        _metadata: &TurnMetadata,
        history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        // Format the most recent assistant message when there is one,
        // otherwise the query text itself.
        let content = history
            .iter()
            .rev()
            .find(|m| m.role == crate::state::Role::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_else(|| query.to_string());
        let formatted = self.format_content(query, &content).await?;
        Ok(AgentReply::complete(formatted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;

    /// **Scenario**: the agent formats the latest assistant message.
    #[tokio::test]
    async fn formats_latest_assistant_message() {
        let llm = Arc::new(ScriptedLlm::always("| a | b |\n|---|---|\n| 1 | 2 |"));
        let agent = FormattingAgent::new(llm);
        let history = vec![
            ChatMessage::user("list the data"),
            ChatMessage::assistant("a is 1 and b is 2"),
        ];
        let reply = agent
            .process("format as a table", &TurnMetadata::default(), &history)
            .await
            .unwrap();
        assert!(reply.response.contains("|---|"));
    }
}
