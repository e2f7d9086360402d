//! Quick-answer gate: answer well-established factual queries from general
//! knowledge without searching, with an offer to go deeper.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{AgentError, Next, Node};

use crate::llm::{complete_json, LlmGateway, LlmRequest};

use super::records::{QuickAnswerAssessment, ResearchRound};
use super::state::ResearchState;

/// Suffix appended to every quick answer.
pub const DEEPER_RESEARCH_OFFER: &str = "\n\n---\n*Would you like me to perform a deeper search \
for more detailed information, sources, or alternative perspectives? Just let me know!*";

pub struct QuickAnswerCheckNode {
    pub llm: Arc<dyn LlmGateway>,
}

fn evaluation_prompt(query: &str) -> String {
    format!(
        r#"Evaluate whether this query can be answered accurately from general knowledge without searching documents or the web.

USER QUERY: {query}

Consider:
1. Is this a well-known, factual query?
2. Can it be answered accurately from general knowledge?
3. Does it require specific, current, or user-specific information that would need searching?
4. Is the answer likely to be stable and well-established? (not time-sensitive or controversial)

Examples of queries that CAN be answered quickly: well-known facts ("What is the best water temperature for tea?"), common knowledge ("What is the capital of France?"), established facts.
Examples of queries that CANNOT: relationships between specific people, time-sensitive topics ("latest developments"), user-specific questions ("what documents do I have about project X?").

STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{{
    "can_answer_quickly": boolean,
    "confidence": number (0.0-1.0),
    "quick_answer": "string (the answer if can_answer_quickly=true, otherwise null)",
    "reasoning": "brief explanation"
}}"#
    )
}

#[async_trait]
impl Node<ResearchState> for QuickAnswerCheckNode {
    fn id(&self) -> &str {
        "quick_answer_check"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::QuickAnswerCheck.as_str().to_string();
        if state.skip_quick_answer {
            tracing::info!("skipping quick answer check, proceeding to full research");
            state.quick_answer_provided = false;
            state.quick_answer_content.clear();
            return Ok((state, Next::Continue));
        }

        let request = LlmRequest::new(evaluation_prompt(&state.query))
            .with_system(
                "You are a query evaluator. Always respond with valid JSON matching the exact \
                 schema provided.",
            )
            .with_temperature(0.3);

        match complete_json::<QuickAnswerAssessment>(self.llm.as_ref(), request).await {
            Ok(assessment) if assessment.can_answer_quickly => {
                if let Some(answer) = assessment.quick_answer.filter(|a| !a.is_empty()) {
                    tracing::info!(
                        confidence = assessment.confidence,
                        "quick answer provided"
                    );
                    let formatted = format!("{}{}", answer, DEEPER_RESEARCH_OFFER);
                    state.quick_answer_provided = true;
                    state.quick_answer_content = formatted.clone();
                    state.final_response = formatted;
                    state.research_complete = true;
                    state.shared_memory.primary_agent_selected =
                        Some("full_research_agent".into());
                    state.shared_memory.last_agent = Some("full_research_agent".into());
                } else {
                    state.quick_answer_provided = false;
                }
            }
            Ok(assessment) => {
                tracing::info!(reasoning = %assessment.reasoning, "query requires full research");
                state.quick_answer_provided = false;
            }
            Err(e) => {
                // Conservative fallback: proceed to full research.
                tracing::warn!(error = %e, "quick answer assessment unparseable");
                state.quick_answer_provided = false;
            }
        }
        Ok((state, Next::Continue))
    }
}

/// Routes out of the gate: short-circuit with the quick answer or continue.
pub fn route_from_quick_answer(state: &ResearchState) -> String {
    if state.quick_answer_provided && !state.quick_answer_content.is_empty() {
        "quick_answer".to_string()
    } else {
        "full_research".to_string()
    }
}

/// Affirmative short replies that turn a quick answer into deep research on
/// the next turn.
const AFFIRMATIVE_KEYWORDS: &[&str] = &[
    "yes",
    "y",
    "ok",
    "okay",
    "sure",
    "go ahead",
    "proceed",
    "do it",
    "search more",
    "deeper search",
    "more information",
    "find more",
    "tell me more",
    "more details",
    "search deeper",
];

const AFFIRMATIVE_PHRASES: &[&str] = &[
    "do a deeper search",
    "perform a deeper search",
    "search for more",
    "find more information",
];

/// True when the message reads as "yes, go deeper": any affirmative keyword
/// in a reply of at most five tokens, or one of the explicit phrases.
pub fn is_affirmative_short_reply(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    let short = lower.split_whitespace().count() <= 5;
    let has_keyword = AFFIRMATIVE_KEYWORDS.iter().any(|k| lower.contains(k));
    (short && has_keyword) || AFFIRMATIVE_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::state::SharedMemory;

    /// **Scenario**: a confident quick answer short-circuits with the deeper
    /// research offer and marks the research agent as primary.
    #[tokio::test]
    async fn quick_answer_short_circuits() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"can_answer_quickly": true, "confidence": 0.95,
                "quick_answer": "Green tea brews best at 80-85C; black tea at 93-100C.",
                "reasoning": "well-established"}"#,
        ));
        let node = QuickAnswerCheckNode { llm };
        let state = ResearchState::for_query(
            "What is the best water temperature for tea?",
            "u1",
            SharedMemory::default(),
            false,
        );
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.quick_answer_provided);
        assert!(out.final_response.contains("80-85C"));
        assert!(out.final_response.contains("deeper search"));
        assert!(out.research_complete);
        assert_eq!(
            out.shared_memory.primary_agent_selected.as_deref(),
            Some("full_research_agent")
        );
        assert_eq!(route_from_quick_answer(&out), "quick_answer");
    }

    /// **Scenario**: skip_quick_answer bypasses the gate entirely (no LLM
    /// call) and routes to full research.
    #[tokio::test]
    async fn skip_flag_bypasses_gate() {
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let node = QuickAnswerCheckNode { llm: llm.clone() };
        let state = ResearchState::for_query("q", "u1", SharedMemory::default(), true);
        let (out, _) = node.run(state).await.unwrap();
        assert!(!out.quick_answer_provided);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(route_from_quick_answer(&out), "full_research");
    }

    /// **Scenario**: unparseable assessment falls back to full research.
    #[tokio::test]
    async fn parse_failure_falls_back_to_full_research() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always("I think so, yes."));
        let node = QuickAnswerCheckNode { llm };
        let state = ResearchState::for_query("q", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert!(!out.quick_answer_provided);
        assert_eq!(route_from_quick_answer(&out), "full_research");
    }

    /// **Scenario**: short affirmatives and deeper-search phrases are
    /// detected; long unrelated messages are not.
    #[test]
    fn affirmative_detection() {
        assert!(is_affirmative_short_reply("yes"));
        assert!(is_affirmative_short_reply("yes, do a deeper search"));
        assert!(is_affirmative_short_reply("sure, go ahead"));
        assert!(is_affirmative_short_reply(
            "please do a deeper search on this topic for me"
        ));
        assert!(!is_affirmative_short_reply(
            "what is the difference between green and black tea leaves"
        ));
        assert!(!is_affirmative_short_reply(""));
    }
}
