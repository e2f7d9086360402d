//! Sufficiency assessments and gap analyses between rounds.
//!
//! Every parse failure applies the conservative documented fallback ("not
//! sufficient", proceed with more research) rather than guessing a stricter
//! interpretation.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{AgentError, Next, Node};

use crate::llm::{complete_json, LlmGateway, LlmRequest};

use super::records::{AssessmentRecord, GapAnalysis, ResearchRound};
use super::state::ResearchState;

/// Characters of each source fed to an assessment prompt.
const ASSESS_SNIPPET_CHARS: usize = 1500;

pub(super) fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

const ASSESSMENT_SCHEMA: &str = r#"STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{
    "sufficient": boolean,
    "has_relevant_info": boolean,
    "confidence": number (0.0-1.0),
    "missing_info": ["list of missing pieces"],
    "reasoning": "brief explanation",
    "best_source": "local" | "web" | "both",
    "needs_more_local": boolean,
    "needs_more_web": boolean
}"#;

fn fallback_assessment(reason: &str) -> AssessmentRecord {
    AssessmentRecord {
        sufficient: false,
        has_relevant_info: false,
        confidence: 0.0,
        missing_info: vec![],
        reasoning: format!("assessment parsing failed - {}", reason),
        best_source: "both".into(),
        needs_more_local: false,
        needs_more_web: false,
    }
}

/// Assesses the combined local + web results of round 1.
pub struct AssessCombinedRound1Node {
    pub llm: Arc<dyn LlmGateway>,
}

#[async_trait]
impl Node<ResearchState> for AssessCombinedRound1Node {
    fn id(&self) -> &str {
        "assess_combined_round1"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        let prompt = format!(
            r#"Assess whether the combined research results below are sufficient to answer the user's query.

USER QUERY: {query}

LOCAL DOCUMENT RESULTS:
{local}

WEB RESULTS:
{web}

{schema}"#,
            query = state.query,
            local = clip(&state.round1_results, ASSESS_SNIPPET_CHARS),
            web = clip(&state.web_round1_results, ASSESS_SNIPPET_CHARS),
            schema = ASSESSMENT_SCHEMA,
        );
        let request = LlmRequest::new(prompt)
            .with_system(
                "You are a research sufficiency assessor. Always respond with valid JSON \
                 matching the exact schema provided.",
            )
            .with_temperature(0.3);

        let assessment = match complete_json::<AssessmentRecord>(self.llm.as_ref(), request).await
        {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "combined round 1 assessment unparseable");
                fallback_assessment("assuming more research needed")
            }
        };
        state.round1_sufficient = assessment.sufficient;
        state.round1_assessment = Some(assessment);
        Ok((state, Next::Continue))
    }
}

/// Routes out of the combined assessment.
pub fn route_from_combined_round1(state: &ResearchState) -> String {
    let assessment = state.round1_assessment.clone().unwrap_or_default();
    if assessment.sufficient {
        "sufficient".to_string()
    } else if assessment.needs_more_web {
        "needs_web_round2".to_string()
    } else {
        "needs_gap_filling".to_string()
    }
}

/// Assesses the web-only results of web round 1.
pub struct AssessWebRound1Node {
    pub llm: Arc<dyn LlmGateway>,
}

#[async_trait]
impl Node<ResearchState> for AssessWebRound1Node {
    fn id(&self) -> &str {
        "assess_web_round1"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::AssessWebRound1.as_str().to_string();
        let prompt = format!(
            r#"Assess whether the web research results below are sufficient to answer the user's query.

USER QUERY: {query}

WEB RESULTS:
{web}

{schema}"#,
            query = state.query,
            web = clip(&state.web_round1_results, ASSESS_SNIPPET_CHARS),
            schema = ASSESSMENT_SCHEMA,
        );
        let request = LlmRequest::new(prompt)
            .with_system(
                "You are a research sufficiency assessor. Always respond with valid JSON \
                 matching the exact schema provided.",
            )
            .with_temperature(0.3);

        let assessment = match complete_json::<AssessmentRecord>(self.llm.as_ref(), request).await
        {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "web round 1 assessment unparseable");
                fallback_assessment("assuming web gap analysis needed")
            }
        };
        state.web_round1_sufficient = assessment.sufficient;
        state.web_round1_assessment = Some(assessment);
        Ok((state, Next::Continue))
    }
}

pub fn route_from_web_round1(state: &ResearchState) -> String {
    if state.web_round1_sufficient {
        "sufficient".to_string()
    } else {
        "needs_web_gap_analysis".to_string()
    }
}

const GAP_SCHEMA: &str = r#"STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{
    "missing_entities": ["entities or topics with no coverage"],
    "suggested_queries": ["follow-up queries to fill the gaps"],
    "needs_web_search": boolean,
    "gap_severity": "minor" | "moderate" | "severe",
    "reasoning": "brief explanation"
}"#;

fn fallback_gaps(original_query: &str) -> GapAnalysis {
    GapAnalysis {
        missing_entities: vec![],
        suggested_queries: vec![original_query.to_string()],
        needs_web_search: false,
        gap_severity: "moderate".into(),
        reasoning: "gap analysis parsing failed - retrying with the original query".into(),
    }
}

fn gaps_from(analysis: &GapAnalysis, original_query: &str) -> Vec<String> {
    if !analysis.suggested_queries.is_empty() {
        analysis.suggested_queries.clone()
    } else if !analysis.missing_entities.is_empty() {
        analysis.missing_entities.clone()
    } else {
        vec![original_query.to_string()]
    }
}

/// Gap analysis after an insufficient local round.
pub struct GapAnalysisNode {
    pub llm: Arc<dyn LlmGateway>,
}

#[async_trait]
impl Node<ResearchState> for GapAnalysisNode {
    fn id(&self) -> &str {
        "gap_analysis"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        let assessment_reasoning = state
            .round1_assessment
            .as_ref()
            .map(|a| a.reasoning.clone())
            .unwrap_or_default();
        let prompt = format!(
            r#"The research so far did not fully answer the user's query. Identify what is missing and how to fill the gaps.

USER QUERY: {query}

RESULTS SO FAR:
{results}

PRIOR ASSESSMENT: {assessment}

{schema}"#,
            query = state.query,
            results = clip(&state.round1_results, ASSESS_SNIPPET_CHARS),
            assessment = assessment_reasoning,
            schema = GAP_SCHEMA,
        );
        let request = LlmRequest::new(prompt)
            .with_system(
                "You are a research gap analyst. Always respond with valid JSON matching the \
                 exact schema provided.",
            )
            .with_temperature(0.3);

        let analysis = match complete_json::<GapAnalysis>(self.llm.as_ref(), request).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "gap analysis unparseable");
                fallback_gaps(&state.original_query)
            }
        };
        state.identified_gaps = gaps_from(&analysis, &state.original_query);
        state.gap_analysis = Some(analysis);
        Ok((state, Next::Continue))
    }
}

/// Routes out of gap analysis: severe gaps that need the web skip round 2
/// local entirely.
pub fn route_from_gap_analysis(state: &ResearchState) -> String {
    let analysis = state.gap_analysis.clone().unwrap_or_default();
    if analysis.gap_severity == "severe" && analysis.needs_web_search {
        "needs_web".to_string()
    } else {
        "round2_local".to_string()
    }
}

/// Gap analysis after an insufficient web round.
pub struct GapAnalysisWebNode {
    pub llm: Arc<dyn LlmGateway>,
}

#[async_trait]
impl Node<ResearchState> for GapAnalysisWebNode {
    fn id(&self) -> &str {
        "gap_analysis_web"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::GapAnalysisWeb.as_str().to_string();
        let prompt = format!(
            r#"The web research so far did not fully answer the user's query. Identify what is missing and whether another targeted web search would help.

USER QUERY: {query}

WEB RESULTS SO FAR:
{results}

{schema}"#,
            query = state.query,
            results = clip(&state.web_round1_results, ASSESS_SNIPPET_CHARS),
            schema = GAP_SCHEMA,
        );
        let request = LlmRequest::new(prompt)
            .with_system(
                "You are a research gap analyst. Always respond with valid JSON matching the \
                 exact schema provided.",
            )
            .with_temperature(0.3);

        let analysis = match complete_json::<GapAnalysis>(self.llm.as_ref(), request).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "web gap analysis unparseable");
                fallback_gaps(&state.original_query)
            }
        };
        state.web_identified_gaps = gaps_from(&analysis, &state.original_query);
        state.web_gap_analysis = Some(analysis);
        Ok((state, Next::Continue))
    }
}

/// Routes out of web gap analysis by the model's own verdict.
pub fn route_from_web_gap_analysis(state: &ResearchState) -> String {
    let analysis = state.web_gap_analysis.clone().unwrap_or_default();
    if analysis.needs_web_search {
        "web_round2".to_string()
    } else {
        "sufficient".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::state::SharedMemory;

    fn state_with_results() -> ResearchState {
        let mut s = ResearchState::for_query("solar sizing", "u1", SharedMemory::default(), false);
        s.round1_results = "panel specs".into();
        s.web_round1_results = "inverter reviews".into();
        s
    }

    /// **Scenario**: a sufficient assessment routes straight to synthesis;
    /// needs_more_web biases to the second web round.
    #[tokio::test]
    async fn combined_assessment_routes() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"sufficient": true, "has_relevant_info": true, "confidence": 0.9,
                "missing_info": [], "reasoning": "covered", "best_source": "both",
                "needs_more_local": false, "needs_more_web": false}"#,
        ));
        let node = AssessCombinedRound1Node { llm };
        let (out, _) = node.run(state_with_results()).await.unwrap();
        assert!(out.round1_sufficient);
        assert_eq!(route_from_combined_round1(&out), "sufficient");

        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"sufficient": false, "needs_more_web": true, "best_source": "web"}"#,
        ));
        let node = AssessCombinedRound1Node { llm };
        let (out, _) = node.run(state_with_results()).await.unwrap();
        assert_eq!(route_from_combined_round1(&out), "needs_web_round2");
    }

    /// **Scenario**: an unparseable assessment takes the conservative path
    /// (not sufficient, gap filling).
    #[tokio::test]
    async fn assessment_parse_failure_is_conservative() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always("Looks good to me!"));
        let node = AssessCombinedRound1Node { llm };
        let (out, _) = node.run(state_with_results()).await.unwrap();
        assert!(!out.round1_sufficient);
        assert_eq!(route_from_combined_round1(&out), "needs_gap_filling");
    }

    /// **Scenario**: severe gaps needing the web skip round-2 local; the
    /// suggested queries become the identified gaps.
    #[tokio::test]
    async fn severe_web_gap_skips_local_round2() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"missing_entities": ["pricing"], "suggested_queries": ["solar inverter pricing 2024"],
                "needs_web_search": true, "gap_severity": "severe", "reasoning": "local corpus lacks pricing"}"#,
        ));
        let node = GapAnalysisNode { llm };
        let (out, _) = node.run(state_with_results()).await.unwrap();
        assert_eq!(out.identified_gaps, vec!["solar inverter pricing 2024"]);
        assert_eq!(route_from_gap_analysis(&out), "needs_web");
    }

    /// **Scenario**: moderate gaps go to round-2 local; empty suggestions
    /// fall back to missing entities then the original query.
    #[tokio::test]
    async fn moderate_gap_goes_local() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"missing_entities": ["battery bank"], "suggested_queries": [],
                "needs_web_search": false, "gap_severity": "moderate", "reasoning": "partial"}"#,
        ));
        let node = GapAnalysisNode { llm };
        let (out, _) = node.run(state_with_results()).await.unwrap();
        assert_eq!(out.identified_gaps, vec!["battery bank"]);
        assert_eq!(route_from_gap_analysis(&out), "round2_local");
    }

    /// **Scenario**: the web gap verdict drives whether web round 2 runs.
    #[tokio::test]
    async fn web_gap_verdict_routes() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"suggested_queries": ["q2"], "needs_web_search": true, "gap_severity": "moderate"}"#,
        ));
        let node = GapAnalysisWebNode { llm };
        let (out, _) = node.run(state_with_results()).await.unwrap();
        assert_eq!(route_from_web_gap_analysis(&out), "web_round2");
        assert_eq!(out.web_identified_gaps, vec!["q2"]);
    }
}
