//! Scripted LLM for tests and examples.
//!
//! Responds from a list of `(prompt substring, reply)` rules: the first rule
//! whose marker appears in the prompt wins. A default reply handles
//! everything else. Records the prompts it saw.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmError, LlmGateway, LlmRequest};

/// Deterministic gateway driven by prompt-content matching.
pub struct ScriptedLlm {
    rules: Vec<(String, String)>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Gateway returning the same reply for every prompt.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Gateway with substring-matched rules and a fallback reply.
    pub fn with_rules<M: Into<String>, R: Into<String>>(
        rules: Vec<(M, R)>,
        default_reply: impl Into<String>,
    ) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(m, r)| (m.into(), r.into()))
                .collect(),
            default_reply: default_reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far (user text only), in call order.
    pub fn seen_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of completions served.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|g| g.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlm {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        if let Ok(mut g) = self.prompts.lock() {
            g.push(request.user.clone());
        }
        for (marker, reply) in &self.rules {
            if request.user.contains(marker.as_str()) {
                return Ok(reply.clone());
            }
        }
        Ok(self.default_reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: the first matching rule wins; unmatched prompts get the
    /// default; prompts are recorded in order.
    #[tokio::test]
    async fn rules_match_in_order() {
        let llm = ScriptedLlm::with_rules(
            vec![
                ("can be answered accurately", "{\"can_answer_quickly\": false}"),
                ("query type", "{\"query_type\": \"objective\"}"),
            ],
            "default reply",
        );
        let a = llm
            .complete(LlmRequest::new("whether this query can be answered accurately today"))
            .await
            .unwrap();
        assert!(a.contains("can_answer_quickly"));
        let b = llm.complete(LlmRequest::new("something else")).await.unwrap();
        assert_eq!(b, "default reply");
        assert_eq!(llm.call_count(), 2);
        assert!(llm.seen_prompts()[0].contains("accurately"));
    }
}
