//! Research workflow: a five-stage pipeline (quick-answer → cache →
//! parallel round 1 → gap-driven round 2 → synthesis) with LLM-driven
//! sufficiency assessment, query-type detection, and an optional formatting
//! hand-off.
//!
//! The graph is built once at startup; per-turn state lives in
//! `ResearchState` and the checkpoint store. The web-search permission gate
//! is plumbed through but disabled by default: passing
//! `interrupt_web_search = true` to the builder re-enables the HITL pause
//! before the first dedicated web round without further changes.

mod assess;
mod cache;
mod expansion;
mod quick_answer;
mod records;
mod rounds;
mod state;
mod synthesis;
mod tool_analysis;

pub use quick_answer::{is_affirmative_short_reply, DEEPER_RESEARCH_OFFER};
pub use records::{
    AssessmentRecord, GapAnalysis, QueryType, QueryTypeDetection, QuickAnswerAssessment,
    ResearchRound,
};
pub use state::ResearchState;
pub use tool_analysis::analyze_tool_needs;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use stategraph::{
    AgentError, Checkpointer, CompilationError, CompiledStateGraph, RunnableConfig, StateGraph,
    END, START,
};

use crate::base::checkpoint_config;
use crate::error::OrchestratorError;
use crate::llm::LlmGateway;
use crate::state::{ChatMessage, PermissionState, TaskStatus, TurnMetadata};
use crate::tools::ToolService;

use super::{Agent, AgentReply};

pub const RESEARCH_AGENT: &str = "full_research_agent";

/// Short denials that cancel a pending permission gate.
const DENIAL_KEYWORDS: &[&str] = &["no", "don't", "do not", "cancel", "stop", "never mind", "nevermind"];

/// True when the message reads as a clear refusal (short and negative).
pub fn is_clear_denial(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    lower.split_whitespace().count() <= 5 && DENIAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn path_map(entries: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

/// Builds the research graph on the shared engine.
pub fn build_research_graph(
    llm: Arc<dyn LlmGateway>,
    tools: Arc<dyn ToolService>,
    checkpointer: Arc<dyn Checkpointer<ResearchState>>,
    interrupt_web_search: bool,
) -> Result<CompiledStateGraph<ResearchState>, CompilationError> {
    let mut graph = StateGraph::<ResearchState>::new();
    graph.add_node(
        "quick_answer_check",
        Arc::new(quick_answer::QuickAnswerCheckNode { llm: llm.clone() }),
    );
    graph.add_node(
        "cache_check",
        Arc::new(cache::CacheCheckNode {
            tools: tools.clone(),
        }),
    );
    graph.add_node(
        "query_expansion",
        Arc::new(expansion::QueryExpansionNode {
            tools: tools.clone(),
        }),
    );
    graph.add_node(
        "round1_parallel_search",
        Arc::new(rounds::Round1ParallelSearchNode {
            tools: tools.clone(),
        }),
    );
    graph.add_node(
        "assess_combined_round1",
        Arc::new(assess::AssessCombinedRound1Node { llm: llm.clone() }),
    );
    graph.add_node(
        "gap_analysis",
        Arc::new(assess::GapAnalysisNode { llm: llm.clone() }),
    );
    graph.add_node(
        "round2_gap_filling",
        Arc::new(rounds::Round2GapFillingNode {
            tools: tools.clone(),
        }),
    );
    graph.add_node(
        "web_round1",
        Arc::new(rounds::WebRound1Node {
            tools: tools.clone(),
        }),
    );
    graph.add_node(
        "assess_web_round1",
        Arc::new(assess::AssessWebRound1Node { llm: llm.clone() }),
    );
    graph.add_node(
        "gap_analysis_web",
        Arc::new(assess::GapAnalysisWebNode { llm: llm.clone() }),
    );
    graph.add_node("web_round2", Arc::new(rounds::WebRound2Node { tools }));
    graph.add_node(
        "detect_query_type",
        Arc::new(synthesis::DetectQueryTypeNode { llm: llm.clone() }),
    );
    graph.add_node(
        "final_synthesis",
        Arc::new(synthesis::FinalSynthesisNode { llm: llm.clone() }),
    );
    graph.add_node("format_data", Arc::new(synthesis::FormatDataNode { llm }));

    graph.add_edge(START, "quick_answer_check");
    graph.add_conditional_edges(
        "quick_answer_check",
        Arc::new(quick_answer::route_from_quick_answer),
        path_map(&[("quick_answer", END), ("full_research", "cache_check")]),
    );
    graph.add_conditional_edges(
        "cache_check",
        Arc::new(cache::route_from_cache),
        path_map(&[
            ("use_cache", "detect_query_type"),
            ("do_research", "query_expansion"),
        ]),
    );
    graph.add_edge("query_expansion", "round1_parallel_search");
    graph.add_edge("round1_parallel_search", "assess_combined_round1");
    graph.add_conditional_edges(
        "assess_combined_round1",
        Arc::new(assess::route_from_combined_round1),
        path_map(&[
            ("sufficient", "detect_query_type"),
            ("needs_gap_filling", "gap_analysis"),
            ("needs_web_round2", "web_round2"),
        ]),
    );
    graph.add_conditional_edges(
        "gap_analysis",
        Arc::new(assess::route_from_gap_analysis),
        path_map(&[
            ("round2_local", "round2_gap_filling"),
            ("needs_web", "web_round1"),
        ]),
    );
    graph.add_conditional_edges(
        "round2_gap_filling",
        Arc::new(rounds::route_from_round2),
        path_map(&[
            ("sufficient", "detect_query_type"),
            ("needs_web", "web_round1"),
        ]),
    );
    graph.add_edge("web_round1", "assess_web_round1");
    graph.add_conditional_edges(
        "assess_web_round1",
        Arc::new(assess::route_from_web_round1),
        path_map(&[
            ("sufficient", "detect_query_type"),
            ("needs_web_gap_analysis", "gap_analysis_web"),
        ]),
    );
    graph.add_conditional_edges(
        "gap_analysis_web",
        Arc::new(assess::route_from_web_gap_analysis),
        path_map(&[
            ("web_round2", "web_round2"),
            ("sufficient", "detect_query_type"),
        ]),
    );
    graph.add_edge("web_round2", "detect_query_type");
    graph.add_edge("detect_query_type", "final_synthesis");
    graph.add_conditional_edges(
        "final_synthesis",
        Arc::new(synthesis::route_from_synthesis),
        path_map(&[("format", "format_data"), ("complete", END)]),
    );
    graph.add_edge("format_data", END);

    if interrupt_web_search {
        graph.interrupt_before(["web_round1"]);
    }
    graph.compile_with_checkpointer(checkpointer)
}

/// The research agent: wraps the graph with follow-up detection, dynamic
/// tool analysis, and permission-interrupt handling.
pub struct ResearchAgent {
    graph: CompiledStateGraph<ResearchState>,
}

impl ResearchAgent {
    pub fn new(
        llm: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolService>,
        checkpointer: Arc<dyn Checkpointer<ResearchState>>,
    ) -> Result<Self, CompilationError> {
        Ok(Self {
            graph: build_research_graph(llm, tools, checkpointer, false)?,
        })
    }

    /// Builder with the web-search HITL gate re-enabled (interrupt before
    /// `web_round1`).
    pub fn with_web_permission_gate(
        llm: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolService>,
        checkpointer: Arc<dyn Checkpointer<ResearchState>>,
    ) -> Result<Self, CompilationError> {
        Ok(Self {
            graph: build_research_graph(llm, tools, checkpointer, true)?,
        })
    }

    /// The compiled graph; the orchestrator reads checkpointed shared memory
    /// through it before classification.
    pub fn graph(&self) -> &CompiledStateGraph<ResearchState> {
        &self.graph
    }

    async fn run_research(
        &self,
        query: &str,
        metadata: &TurnMetadata,
        config: &RunnableConfig,
    ) -> Result<AgentReply, OrchestratorError> {
        let snapshot = self.graph.get_state(config).await?;

        // Shared memory: checkpoint first, then the request (request wins,
        // permission grants never regress).
        let mut shared_memory = snapshot
            .as_ref()
            .map(|s| s.values.shared_memory.clone())
            .unwrap_or_default();
        shared_memory.absorb(&metadata.shared_memory);

        // Follow-up detection: a quick answer last turn plus a short
        // affirmative now means "go deeper".
        let quick_answer_last_turn = snapshot
            .as_ref()
            .map(|s| s.values.quick_answer_provided)
            .unwrap_or(false);
        let skip_quick_answer = metadata.skip_quick_answer
            || (quick_answer_last_turn && is_affirmative_short_reply(query));
        if skip_quick_answer && quick_answer_last_turn {
            tracing::info!("follow-up detected: deeper research requested after quick answer");
        }

        let analysis = analyze_tool_needs(query, &shared_memory.previous_tools_used);
        shared_memory.tool_analysis = Some(analysis);
        shared_memory.previous_tools_used.clear();

        let initial = ResearchState::for_query(
            query,
            metadata.user_id.clone(),
            shared_memory,
            skip_quick_answer,
        )
        .with_conversation(metadata.conversation_id.clone());

        match self.graph.invoke(Some(initial), Some(config.clone())).await {
            Ok(state) => {
                let status = if state.research_complete {
                    TaskStatus::Complete
                } else {
                    TaskStatus::Incomplete
                };
                Ok(AgentReply::complete(state.final_response)
                    .with_status(status)
                    .with_results(json!({
                        "sources_used": state.sources_used,
                        "quick_answer_provided": state.quick_answer_provided,
                        "current_round": state.current_round,
                        "tool_analysis": state.shared_memory.tool_analysis,
                        "tools_used": state.shared_memory.previous_tools_used,
                    })))
            }
            Err(AgentError::Interrupted(interrupt)) => {
                // Web-search permission gate: record the pending grant and
                // hand the decision to the user.
                self.graph
                    .update_state(config, |s| {
                        s.shared_memory.web_search_permission = Some(PermissionState::Pending);
                        s.task_status = TaskStatus::PermissionRequired;
                    })
                    .await?;
                tracing::info!(node = %interrupt.0.node_id, "research paused for web permission");
                Ok(AgentReply::complete(
                    "I've checked your documents but need to search the web for a complete \
                     answer. Shall I proceed with a web search?",
                )
                .with_status(TaskStatus::PermissionRequired))
            }
            Err(e) => Err(OrchestratorError::Workflow(e.to_string())),
        }
    }

    /// True when this thread is paused awaiting the web-search grant.
    pub async fn pending_web_permission(&self, metadata: &TurnMetadata) -> bool {
        let config = checkpoint_config(metadata);
        match self.graph.get_state(&config).await {
            Ok(Some(snapshot)) => {
                snapshot.is_interrupted()
                    && snapshot.values.shared_memory.web_search_permission
                        == Some(PermissionState::Pending)
            }
            _ => false,
        }
    }

    /// Grants the pending permission and resumes the paused workflow with a
    /// single new user message; every other shared-memory key is preserved.
    pub async fn grant_and_resume(
        &self,
        message: &str,
        metadata: &TurnMetadata,
    ) -> Result<AgentReply, OrchestratorError> {
        let config = checkpoint_config(metadata);
        let message = message.to_string();
        self.graph
            .update_state(&config, move |s| {
                s.shared_memory.web_search_permission = Some(PermissionState::Granted);
                s.messages.push(ChatMessage::user(message));
            })
            .await?;
        let state = self.graph.invoke(None, Some(config)).await.map_err(|e| {
            OrchestratorError::Workflow(format!("resume after permission grant: {}", e))
        })?;
        Ok(AgentReply::complete(state.final_response).with_results(json!({
            "sources_used": state.sources_used,
            "resumed_from_interrupt": true,
        })))
    }

    /// Cancels a pending gate; the next turn behaves as a fresh start.
    pub async fn cancel_pending(&self, metadata: &TurnMetadata) -> Result<(), OrchestratorError> {
        let config = checkpoint_config(metadata);
        self.graph.clear_interrupt(&config).await?;
        Ok(())
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn name(&self) -> &str {
        RESEARCH_AGENT
    }

    async fn process(
        &self,
        query: &str,
        metadata: &TurnMetadata,
        _history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        let config = checkpoint_config(metadata);

        if self.pending_web_permission(metadata).await {
            if is_affirmative_short_reply(query) && !is_clear_denial(query) {
                return self.grant_and_resume(query, metadata).await;
            }
            if is_clear_denial(query) {
                self.cancel_pending(metadata).await?;
                return Ok(AgentReply::complete(
                    "Understood - I'll skip the web search. Let me know if you'd like me to \
                     look again with different sources.",
                ));
            }
            // Anything else is a fresh turn.
            self.cancel_pending(metadata).await?;
        }

        self.run_research(query, metadata, &config).await
    }
}
