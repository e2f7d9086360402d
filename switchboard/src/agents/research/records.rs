//! Typed records parsed from research-stage LLM output, plus the round tags
//! used for observability.

use serde::{Deserialize, Serialize};

/// Workflow stage tag stored in `current_round`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchRound {
    QuickAnswerCheck,
    CacheCheck,
    InitialLocal,
    Round2GapFilling,
    WebRound1,
    AssessWebRound1,
    GapAnalysisWeb,
    WebRound2,
    FinalSynthesis,
}

impl ResearchRound {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchRound::QuickAnswerCheck => "quick_answer_check",
            ResearchRound::CacheCheck => "cache_check",
            ResearchRound::InitialLocal => "initial_local",
            ResearchRound::Round2GapFilling => "round_2_gap_filling",
            ResearchRound::WebRound1 => "web_round_1",
            ResearchRound::AssessWebRound1 => "assess_web_round_1",
            ResearchRound::GapAnalysisWeb => "gap_analysis_web",
            ResearchRound::WebRound2 => "web_round_2",
            ResearchRound::FinalSynthesis => "final_synthesis",
        }
    }
}

/// Quick-answer gate verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickAnswerAssessment {
    #[serde(default)]
    pub can_answer_quickly: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub quick_answer: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// Sufficiency assessment of a research round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(default)]
    pub sufficient: bool,
    #[serde(default)]
    pub has_relevant_info: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    /// `local`, `web`, or `both`.
    #[serde(default)]
    pub best_source: String,
    #[serde(default)]
    pub needs_more_local: bool,
    #[serde(default)]
    pub needs_more_web: bool,
}

/// Gap analysis of an insufficient round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    #[serde(default)]
    pub missing_entities: Vec<String>,
    #[serde(default)]
    pub suggested_queries: Vec<String>,
    #[serde(default)]
    pub needs_web_search: bool,
    /// `minor`, `moderate`, or `severe`.
    #[serde(default)]
    pub gap_severity: String,
    #[serde(default)]
    pub reasoning: String,
}

/// Whether synthesis should present options or a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Objective,
    Subjective,
    Mixed,
}

impl Default for QueryType {
    fn default() -> Self {
        QueryType::Objective
    }
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Objective => "objective",
            QueryType::Subjective => "subjective",
            QueryType::Mixed => "mixed",
        }
    }
}

/// Query-type detection result driving synthesis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTypeDetection {
    #[serde(default)]
    pub query_type: QueryType,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub should_present_options: bool,
    /// 2 or 3; only meaningful when options are presented.
    #[serde(default)]
    pub num_options: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: round tags render the exact snake_case wire names.
    #[test]
    fn round_tags_match_wire_names() {
        assert_eq!(ResearchRound::QuickAnswerCheck.as_str(), "quick_answer_check");
        assert_eq!(ResearchRound::Round2GapFilling.as_str(), "round_2_gap_filling");
        assert_eq!(ResearchRound::AssessWebRound1.as_str(), "assess_web_round_1");
    }

    /// **Scenario**: an assessment parses from model JSON with partial keys.
    #[test]
    fn assessment_parses_with_defaults() {
        let a: AssessmentRecord = serde_json::from_str(
            r#"{"sufficient": true, "confidence": 0.8, "best_source": "both"}"#,
        )
        .unwrap();
        assert!(a.sufficient);
        assert_eq!(a.best_source, "both");
        assert!(!a.needs_more_web);
    }

    /// **Scenario**: query-type detection parses the lowercase enum.
    #[test]
    fn query_type_parses_lowercase() {
        let d: QueryTypeDetection = serde_json::from_str(
            r#"{"query_type": "subjective", "confidence": 0.95, "should_present_options": true, "num_options": 3}"#,
        )
        .unwrap();
        assert_eq!(d.query_type, QueryType::Subjective);
        assert_eq!(d.num_options, Some(3));
    }
}
