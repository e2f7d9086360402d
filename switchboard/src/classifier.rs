//! Intent classifier: maps a user message plus conversation context to a
//! target agent and action.

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{complete_json, LlmGateway, LlmRequest};
use crate::state::SharedMemory;

/// Classifier output.
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub target_agent: String,
    #[serde(default)]
    pub action_intent: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl Classification {
    fn fallback(reason: &str) -> Self {
        Self {
            target_agent: "chat".into(),
            action_intent: "converse".into(),
            confidence: 0.3,
            reasoning: format!("classification fell back to chat: {}", reason),
        }
    }
}

pub struct IntentClassifier {
    llm: Arc<dyn LlmGateway>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }

    fn prompt(message: &str, shared_memory: &SharedMemory, agents: &[String]) -> String {
        let mut context_lines = Vec::new();
        if let Some(primary) = &shared_memory.primary_agent_selected {
            context_lines.push(format!(
                "- primary_agent_selected (prefer continuity): {}",
                primary
            ));
        }
        if let Some(last) = &shared_memory.last_agent {
            context_lines.push(format!("- last_agent: {}", last));
        }
        if let Some(response) = &shared_memory.last_response {
            let trimmed: String = response.chars().take(300).collect();
            context_lines.push(format!("- last_response: {}", trimmed));
        }
        if shared_memory.active_editor.is_some() {
            context_lines.push("- the user has a document open in the editor".into());
        }
        let context = if context_lines.is_empty() {
            "none".to_string()
        } else {
            context_lines.join("\n")
        };

        format!(
            r#"Route this user message to the best agent.

USER MESSAGE: {message}

AVAILABLE AGENTS: {agents}

CONVERSATION CONTEXT:
{context}

Prefer the previously selected agent when the message continues the same thread of work.

STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{{
    "target_agent": "one of the available agents",
    "action_intent": "short label for what the user wants",
    "confidence": number (0.0-1.0),
    "reasoning": "brief explanation"
}}"#,
            agents = agents.join(", "),
        )
    }

    /// Classifies the turn. Parse failure falls back to `chat`.
    pub async fn classify(
        &self,
        message: &str,
        shared_memory: &SharedMemory,
        available_agents: &[String],
    ) -> Classification {
        let request = LlmRequest::new(Self::prompt(message, shared_memory, available_agents))
            .with_system(
                "You are an agent router. Always respond with valid JSON matching the exact \
                 schema provided.",
            )
            .with_temperature(0.1);
        match complete_json::<Classification>(self.llm.as_ref(), request).await {
            Ok(c) if !c.target_agent.is_empty() => c,
            Ok(_) => Classification::fallback("empty target agent"),
            Err(e) => {
                tracing::warn!(error = %e, "intent classification unparseable");
                Classification::fallback(&e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;

    /// **Scenario**: a clean classification routes to the named agent.
    #[tokio::test]
    async fn classification_parses() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"target_agent": "full_research_agent", "action_intent": "research",
                "confidence": 0.9, "reasoning": "asks for sources"}"#,
        ));
        let classifier = IntentClassifier::new(llm);
        let c = classifier
            .classify(
                "find sources on heat pumps",
                &SharedMemory::default(),
                &["chat".into(), "full_research_agent".into()],
            )
            .await;
        assert_eq!(c.target_agent, "full_research_agent");
        assert!(c.confidence > 0.5);
    }

    /// **Scenario**: unparseable output falls back to chat.
    #[tokio::test]
    async fn parse_failure_falls_back_to_chat() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always("probably research?"));
        let classifier = IntentClassifier::new(llm);
        let c = classifier
            .classify("hello", &SharedMemory::default(), &["chat".into()])
            .await;
        assert_eq!(c.target_agent, "chat");
    }

    /// **Scenario**: the prompt carries continuity context from shared
    /// memory.
    #[test]
    fn prompt_includes_continuity() {
        let sm = SharedMemory {
            primary_agent_selected: Some("org_agent".into()),
            last_response: Some("Added to inbox.".into()),
            ..Default::default()
        };
        let prompt = IntentClassifier::prompt("and the next one", &sm, &["chat".into()]);
        assert!(prompt.contains("primary_agent_selected"));
        assert!(prompt.contains("org_agent"));
        assert!(prompt.contains("Added to inbox."));
    }
}
