//! Research workflow state: the base turn fields plus every research-stage
//! extension. Extensions are additive; nodes only touch the fields they own.

use serde::{Deserialize, Serialize};

use crate::state::{ChatMessage, SharedMemory, TaskStatus};

use super::records::{AssessmentRecord, GapAnalysis, QueryType, QueryTypeDetection};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    // Base turn fields.
    pub messages: Vec<ChatMessage>,
    pub user_id: String,
    #[serde(default)]
    pub conversation_id: String,
    pub query: String,
    pub original_query: String,
    pub shared_memory: SharedMemory,
    pub task_status: TaskStatus,
    #[serde(default)]
    pub error: String,

    // Quick-answer gate.
    #[serde(default)]
    pub quick_answer_provided: bool,
    #[serde(default)]
    pub quick_answer_content: String,
    #[serde(default)]
    pub skip_quick_answer: bool,
    #[serde(default)]
    pub current_round: String,

    // Cache.
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default)]
    pub cached_context: String,

    // Expansion.
    #[serde(default)]
    pub expanded_queries: Vec<String>,
    #[serde(default)]
    pub key_entities: Vec<String>,

    // Round 1 (parallel local + web).
    #[serde(default)]
    pub round1_results: String,
    #[serde(default)]
    pub round1_sufficient: bool,
    #[serde(default)]
    pub round1_assessment: Option<AssessmentRecord>,

    // Gap analysis and round 2 local.
    #[serde(default)]
    pub gap_analysis: Option<GapAnalysis>,
    #[serde(default)]
    pub identified_gaps: Vec<String>,
    #[serde(default)]
    pub round2_results: String,
    #[serde(default)]
    pub round2_sufficient: bool,

    // Web rounds.
    #[serde(default)]
    pub web_round1_results: String,
    #[serde(default)]
    pub web_round1_sufficient: bool,
    #[serde(default)]
    pub web_round1_assessment: Option<AssessmentRecord>,
    #[serde(default)]
    pub web_gap_analysis: Option<GapAnalysis>,
    #[serde(default)]
    pub web_identified_gaps: Vec<String>,
    #[serde(default)]
    pub web_round2_results: String,
    #[serde(default)]
    pub web_permission_granted: bool,

    // Synthesis.
    #[serde(default)]
    pub query_type: Option<QueryType>,
    #[serde(default)]
    pub query_type_detection: Option<QueryTypeDetection>,
    #[serde(default)]
    pub should_present_options: bool,
    #[serde(default)]
    pub num_options: Option<u8>,
    #[serde(default)]
    pub final_response: String,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub sources_used: Vec<String>,
    #[serde(default)]
    pub research_complete: bool,
    #[serde(default)]
    pub routing_recommendation: Option<String>,
}

impl ResearchState {
    /// Initial state for a turn.
    pub fn for_query(
        query: impl Into<String>,
        user_id: impl Into<String>,
        shared_memory: SharedMemory,
        skip_quick_answer: bool,
    ) -> Self {
        let query = query.into();
        Self {
            messages: vec![ChatMessage::user(query.clone())],
            user_id: user_id.into(),
            original_query: query.clone(),
            query,
            shared_memory,
            skip_quick_answer,
            ..Default::default()
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: initial state carries the query twice (query and
    /// original_query) and one user message.
    #[test]
    fn for_query_initializes_base_fields() {
        let s = ResearchState::for_query("tea temp", "u1", SharedMemory::default(), false);
        assert_eq!(s.query, "tea temp");
        assert_eq!(s.original_query, "tea temp");
        assert_eq!(s.messages.len(), 1);
        assert!(!s.skip_quick_answer);
        assert!(!s.research_complete);
    }

    /// **Scenario**: the full research state round-trips through serde, so
    /// checkpointing it is the identity.
    #[test]
    fn research_state_serde_roundtrip() {
        let mut s = ResearchState::for_query("q", "u", SharedMemory::default(), true);
        s.expanded_queries = vec!["q1".into(), "q2".into()];
        s.round1_results = "local content".into();
        s.query_type = Some(QueryType::Subjective);
        s.num_options = Some(3);
        let json = serde_json::to_string(&s).unwrap();
        let back: ResearchState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expanded_queries, s.expanded_queries);
        assert_eq!(back.query_type, Some(QueryType::Subjective));
        assert_eq!(back.num_options, Some(3));
    }
}
