//! Query-type detection and final synthesis.
//!
//! Subjective queries (and some mixed ones) present 2-3 named options;
//! objective queries synthesize a single answer; mixed queries without
//! options synthesize a primary answer and explicitly mention alternatives.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{AgentError, Next, Node};

use crate::agents::formatting::formatting_prompt;
use crate::llm::{complete_json, LlmGateway, LlmRequest};

use super::assess::clip;
use super::records::{QueryType, QueryTypeDetection, ResearchRound};
use super::state::ResearchState;

pub struct DetectQueryTypeNode {
    pub llm: Arc<dyn LlmGateway>,
}

fn detection_prompt(query: &str) -> String {
    format!(
        r#"Analyze this query to determine whether it should receive a synthesized single answer or multiple distinct options.

USER QUERY: {query}

Consider:
1. **Objective queries** (synthesize single answer): factual, process, historical, or scientific questions with a clear answer.
2. **Subjective queries** (present 2-3 options): preference-based requests (recipes, style choices, purchases, creative projects) where multiple valid approaches exist.
3. **Mixed queries** (synthesize with alternatives mentioned): a standard approach exists but notable variations deserve a mention.

STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{{
    "query_type": "objective" | "subjective" | "mixed",
    "confidence": number (0.0-1.0),
    "reasoning": "brief explanation",
    "should_present_options": boolean,
    "num_options": number (2-3, only relevant if should_present_options=true)
}}"#
    )
}

#[async_trait]
impl Node<ResearchState> for DetectQueryTypeNode {
    fn id(&self) -> &str {
        "detect_query_type"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        let request = LlmRequest::new(detection_prompt(&state.query))
            .with_system(
                "You are a query type classifier. Always respond with valid JSON matching the \
                 exact schema provided.",
            )
            .with_temperature(0.3);

        let detection = match complete_json::<QueryTypeDetection>(self.llm.as_ref(), request).await
        {
            Ok(d) => d,
            Err(e) => {
                // Fallback: default to objective (synthesize).
                tracing::warn!(error = %e, "query type detection unparseable");
                QueryTypeDetection {
                    query_type: QueryType::Objective,
                    confidence: 0.5,
                    reasoning: "detection parsing failed - defaulting to objective".into(),
                    should_present_options: false,
                    num_options: None,
                }
            }
        };
        tracing::info!(
            query_type = detection.query_type.as_str(),
            options = detection.should_present_options,
            "query type detected"
        );
        state.query_type = Some(detection.query_type);
        state.should_present_options = detection.should_present_options;
        state.num_options = detection.num_options;
        state.query_type_detection = Some(detection);
        Ok((state, Next::Continue))
    }
}

/// Deterministic formatting-need detector: structured output pays off when
/// the query asks for data shapes or the answer already reads like a table.
pub fn detect_formatting_need(query: &str, response: &str) -> Option<String> {
    const QUERY_MARKERS: &[&str] = &[
        "table",
        "chart",
        "spreadsheet",
        "csv",
        "format as",
        "side by side",
        "comparison of",
    ];
    let query_lower = query.to_lowercase();
    if QUERY_MARKERS.iter().any(|m| query_lower.contains(m)) {
        return Some("data_formatting".to_string());
    }
    let pipe_rows = response.lines().filter(|l| l.trim_start().starts_with('|')).count();
    if pipe_rows >= 3 {
        return Some("data_formatting".to_string());
    }
    None
}

pub struct FinalSynthesisNode {
    pub llm: Arc<dyn LlmGateway>,
}

fn options_prompt(query: &str, context: &str, reasoning: &str, num_options: u8) -> String {
    format!(
        r#"Based on all available research, present {num_options} distinct, well-researched approaches to the user's query.

USER QUERY: {query}

RESEARCH FINDINGS:
{context}

REASONING FOR PRESENTING OPTIONS:
{reasoning}

Provide a well-organized response that:
1. Presents {num_options} distinct approaches/options (each with clear title/name)
2. For each option, includes key characteristics, advantages and trade-offs, and when it works best
3. Highlights key differences between the options
4. Cites sources where appropriate

Format as:
## Option 1: [Name]
[Description, characteristics, advantages, trade-offs, when to use]

## Option 2: [Name]
[Description, characteristics, advantages, trade-offs, when to use]

## Option 3: [Name] (if num_options=3)
[Description, characteristics, advantages, trade-offs, when to use]

Your response with {num_options} distinct options:"#
    )
}

fn mixed_prompt(query: &str, context: &str, reasoning: &str) -> String {
    format!(
        r#"Based on all available research, provide a comprehensive answer to the user's query, with the primary approach synthesized and notable alternatives mentioned.

USER QUERY: {query}

RESEARCH FINDINGS:
{context}

REASONING:
{reasoning}

Provide a well-organized response that synthesizes the primary/standard approach, mentions notable alternative approaches, explains when alternatives might be preferred, and cites sources where appropriate.

Your comprehensive response:"#
    )
}

fn objective_prompt(query: &str, context: &str) -> String {
    format!(
        r#"Based on all available research, provide a comprehensive answer to the user's query.

USER QUERY: {query}

RESEARCH FINDINGS:
{context}

Provide a well-organized, thorough response that directly answers the query, synthesizes information from all sources, cites sources where appropriate, acknowledges any remaining gaps, and uses clear, professional language.

Your comprehensive response:"#
    )
}

#[async_trait]
impl Node<ResearchState> for FinalSynthesisNode {
    fn id(&self) -> &str {
        "final_synthesis"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::FinalSynthesis.as_str().to_string();

        // Context assembly with per-source character caps.
        let mut parts = Vec::new();
        if !state.cached_context.is_empty() {
            parts.push(format!("CACHED RESEARCH:\n{}", state.cached_context));
        }
        if !state.round1_results.is_empty() {
            parts.push(format!(
                "LOCAL SEARCH ROUND 1:\n{}",
                clip(&state.round1_results, 2000)
            ));
        }
        if !state.round2_results.is_empty() {
            parts.push(format!(
                "LOCAL SEARCH ROUND 2:\n{}",
                clip(&state.round2_results, 1500)
            ));
        }
        if !state.web_round1_results.is_empty() {
            parts.push(format!(
                "WEB SEARCH ROUND 1:\n{}",
                clip(&state.web_round1_results, 2000)
            ));
        }
        if !state.web_round2_results.is_empty() {
            parts.push(format!(
                "WEB SEARCH ROUND 2:\n{}",
                clip(&state.web_round2_results, 1500)
            ));
        }
        let context = parts.join("\n\n");

        let query_type = state.query_type.unwrap_or_default();
        let reasoning = state
            .query_type_detection
            .as_ref()
            .map(|d| d.reasoning.clone())
            .unwrap_or_default();
        let prompt = if state.should_present_options
            && matches!(query_type, QueryType::Subjective | QueryType::Mixed)
        {
            let n = state.num_options.unwrap_or(3).clamp(2, 3);
            options_prompt(&state.query, &context, &reasoning, n)
        } else if query_type == QueryType::Mixed {
            mixed_prompt(&state.query, &context, &reasoning)
        } else {
            objective_prompt(&state.query, &context)
        };

        let request = LlmRequest::new(prompt)
            .with_system("You are an expert research synthesizer.")
            .with_temperature(0.3);
        match self.llm.complete(request).await {
            Ok(response) => {
                tracing::info!(chars = response.len(), "synthesis complete");
                state.routing_recommendation = detect_formatting_need(&state.query, &response);
                state.final_response = response;
            }
            Err(e) => {
                tracing::error!(error = %e, "synthesis failed");
                state.final_response = format!("Research completed but synthesis failed: {}", e);
                state.error = e.to_string();
            }
        }

        let mut sources = Vec::new();
        if !state.round1_results.is_empty() {
            sources.push("local_round1".to_string());
        }
        if !state.round2_results.is_empty() {
            sources.push("local_round2".to_string());
        }
        if !state.web_round1_results.is_empty() {
            sources.push("web_round1".to_string());
        }
        if !state.web_round2_results.is_empty() {
            sources.push("web_round2".to_string());
        }
        if !state.cached_context.is_empty() {
            sources.push("cache".to_string());
        }
        state.sources_used = sources;
        state.research_complete = true;
        state.shared_memory.primary_agent_selected = Some("full_research_agent".into());
        state.shared_memory.last_agent = Some("full_research_agent".into());
        Ok((state, Next::Continue))
    }
}

/// Routes out of synthesis into the optional formatting hand-off.
pub fn route_from_synthesis(state: &ResearchState) -> String {
    if state.routing_recommendation.as_deref() == Some("data_formatting") {
        "format".to_string()
    } else {
        "complete".to_string()
    }
}

/// Hands the synthesized response to the data-formatting pass.
pub struct FormatDataNode {
    pub llm: Arc<dyn LlmGateway>,
}

#[async_trait]
impl Node<ResearchState> for FormatDataNode {
    fn id(&self) -> &str {
        "format_data"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        let request = LlmRequest::new(formatting_prompt(&state.query, &state.final_response))
            .with_system("You are a data formatting specialist.")
            .with_temperature(0.2);
        match self.llm.complete(request).await {
            Ok(formatted) if !formatted.is_empty() => {
                state.final_response = formatted;
            }
            Ok(_) => {}
            Err(e) => {
                // Formatting is best-effort; keep the synthesized answer.
                tracing::warn!(error = %e, "formatting hand-off failed");
            }
        }
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::state::SharedMemory;

    /// **Scenario**: subjective detection flows into the option-presenting
    /// synthesis prompt and the response keeps the option headers.
    #[tokio::test]
    async fn subjective_query_presents_options() {
        let detect: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always(
            r#"{"query_type": "subjective", "confidence": 0.95,
                "reasoning": "recipes are preference-based",
                "should_present_options": true, "num_options": 3}"#,
        ));
        let node = DetectQueryTypeNode { llm: detect };
        let state =
            ResearchState::for_query("Perfect hot cocoa recipe", "u1", SharedMemory::default(), false);
        let (state, _) = node.run(state).await.unwrap();
        assert_eq!(state.query_type, Some(QueryType::Subjective));
        assert!(state.should_present_options);
        assert_eq!(state.num_options, Some(3));

        let synth: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::with_rules(
            vec![(
                "distinct options",
                "## Option 1: Classic Dark\n...\n## Option 2: Creamy Milk\n...\n## Option 3: Spiced\n...",
            )],
            "single answer",
        ));
        let node = FinalSynthesisNode { llm: synth };
        let mut state = state;
        state.round1_results = "cocoa research".into();
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.final_response.contains("## Option 1:"));
        assert!(out.final_response.contains("## Option 2:"));
        assert!(out.research_complete);
        assert_eq!(out.sources_used, vec!["local_round1"]);
        assert_eq!(
            out.shared_memory.primary_agent_selected.as_deref(),
            Some("full_research_agent")
        );
    }

    /// **Scenario**: detection parse failure defaults to objective with no
    /// options.
    #[tokio::test]
    async fn detection_parse_failure_defaults_objective() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always("subjective, probably"));
        let node = DetectQueryTypeNode { llm };
        let state = ResearchState::for_query("q", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.query_type, Some(QueryType::Objective));
        assert!(!out.should_present_options);
    }

    /// **Scenario**: the formatting detector fires on table-seeking queries
    /// and table-shaped responses, and routes to format_data.
    #[test]
    fn formatting_need_detection() {
        assert_eq!(
            detect_formatting_need("show a comparison of panels as a table", "text"),
            Some("data_formatting".to_string())
        );
        let tabular = "| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |";
        assert_eq!(
            detect_formatting_need("anything", tabular),
            Some("data_formatting".to_string())
        );
        assert_eq!(detect_formatting_need("why is the sky blue", "prose"), None);

        let mut state = ResearchState::default();
        state.routing_recommendation = Some("data_formatting".into());
        assert_eq!(route_from_synthesis(&state), "format");
        state.routing_recommendation = None;
        assert_eq!(route_from_synthesis(&state), "complete");
    }

    /// **Scenario**: format_data replaces the response; a failure keeps the
    /// synthesized answer.
    #[tokio::test]
    async fn format_data_replaces_response() {
        let llm: Arc<dyn LlmGateway> = Arc::new(ScriptedLlm::always("formatted table"));
        let node = FormatDataNode { llm };
        let mut state = ResearchState::for_query("q", "u1", SharedMemory::default(), false);
        state.final_response = "raw".into();
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.final_response, "formatted table");
    }
}
