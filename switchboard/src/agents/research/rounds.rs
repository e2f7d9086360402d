//! Search rounds: the parallel local+web round 1, the local gap-filling
//! round 2, and the two targeted web rounds.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{AgentError, Next, Node};

use crate::tools::{ToolError, ToolService, WebResearch};

use super::records::ResearchRound;
use super::state::ResearchState;

pub const SEARCH_LIMIT: u32 = 10;
const ROUND2_SUFFICIENT_CHARS: usize = 100;

async fn local_search(
    tools: &dyn ToolService,
    queries: &[String],
    user_id: &str,
) -> Result<String, ToolError> {
    let mut sections = Vec::new();
    for query in queries.iter().take(3) {
        let result = tools.search_documents(query, user_id, SEARCH_LIMIT).await?;
        for hit in result.results {
            sections.push(format!("[{}] {}\n{}", hit.filename, hit.title, hit.content_preview));
        }
    }
    Ok(sections.join("\n\n"))
}

/// Round 1: fan out local document search (top-3 expanded queries) and web
/// search-and-crawl, tolerating a failure on either branch. Both results are
/// always stored.
pub struct Round1ParallelSearchNode {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Node<ResearchState> for Round1ParallelSearchNode {
    fn id(&self) -> &str {
        "round1_parallel_search"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::InitialLocal.as_str().to_string();
        let queries = if state.expanded_queries.is_empty() {
            vec![state.query.clone()]
        } else {
            state.expanded_queries.clone()
        };

        let (local, web) = tokio::join!(
            local_search(self.tools.as_ref(), &queries, &state.user_id),
            self.tools
                .search_and_crawl(&state.query, SEARCH_LIMIT, &state.user_id),
        );
        state.shared_memory.record_tool("search_documents");
        state.shared_memory.record_tool("search_and_crawl");

        match local {
            Ok(content) => state.round1_results = content,
            Err(e) => {
                tracing::warn!(error = %e, "round 1 local search failed");
                state.round1_results = String::new();
                state.error = format!("local search: {}", e);
            }
        }
        match web {
            Ok(research) => {
                state.web_round1_results = research.content;
            }
            Err(e) => {
                tracing::warn!(error = %e, "round 1 web search failed");
                state.web_round1_results = String::new();
                state.error = format!("web search: {}", e);
            }
        }
        tracing::info!(
            local_chars = state.round1_results.len(),
            web_chars = state.web_round1_results.len(),
            "round 1 parallel search complete"
        );
        Ok((state, Next::Continue))
    }
}

/// Round 2: targeted local search over up to three gap queries.
pub struct Round2GapFillingNode {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Node<ResearchState> for Round2GapFillingNode {
    fn id(&self) -> &str {
        "round2_gap_filling"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::Round2GapFilling.as_str().to_string();
        let gaps = if state.identified_gaps.is_empty() {
            vec![state.original_query.clone()]
        } else {
            state.identified_gaps.clone()
        };
        match local_search(self.tools.as_ref(), &gaps, &state.user_id).await {
            Ok(content) => {
                state.round2_sufficient = content.len() > ROUND2_SUFFICIENT_CHARS;
                state.round2_results = content;
            }
            Err(e) => {
                tracing::warn!(error = %e, "round 2 gap filling failed");
                state.round2_results = String::new();
                state.round2_sufficient = false;
            }
        }
        state.shared_memory.record_tool("search_documents");
        Ok((state, Next::Continue))
    }
}

/// Routes out of round 2: sufficient content synthesizes, else the web.
pub fn route_from_round2(state: &ResearchState) -> String {
    if state.round2_sufficient {
        "sufficient".to_string()
    } else {
        "needs_web".to_string()
    }
}

fn apply_web_result(state: &mut ResearchState, result: Result<WebResearch, ToolError>) -> String {
    match result {
        Ok(research) => research.content,
        Err(e) => {
            tracing::warn!(error = %e, "web search failed");
            state.error = format!("web search: {}", e);
            String::new()
        }
    }
}

/// First dedicated web round over the original query.
pub struct WebRound1Node {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Node<ResearchState> for WebRound1Node {
    fn id(&self) -> &str {
        "web_round1"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::WebRound1.as_str().to_string();
        let result = self
            .tools
            .search_and_crawl(&state.query, SEARCH_LIMIT, &state.user_id)
            .await;
        state.shared_memory.record_tool("search_and_crawl");
        state.web_round1_results = apply_web_result(&mut state, result);
        // The external permission gate is handled at the orchestrator layer.
        state.web_permission_granted = true;
        Ok((state, Next::Continue))
    }
}

/// Second web round targeted at the top gap query.
pub struct WebRound2Node {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Node<ResearchState> for WebRound2Node {
    fn id(&self) -> &str {
        "web_round2"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::WebRound2.as_str().to_string();
        let target = state
            .web_identified_gaps
            .first()
            .or_else(|| state.identified_gaps.first())
            .cloned()
            .unwrap_or_else(|| state.original_query.clone());
        let result = self
            .tools
            .search_and_crawl(&target, SEARCH_LIMIT, &state.user_id)
            .await;
        state.shared_memory.record_tool("search_and_crawl");
        state.web_round2_results = apply_web_result(&mut state, result);
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedMemory;
    use crate::tools::{DocumentHit, RecordingTools, SearchDocumentsResult};

    fn tools_with_docs() -> Arc<RecordingTools> {
        let tools = Arc::new(RecordingTools::default());
        tools.set_documents(SearchDocumentsResult {
            results: vec![DocumentHit {
                document_id: "d1".into(),
                title: "Solar Notes".into(),
                filename: "solar.md".into(),
                content_preview: "panel sizing and inverter selection details".into(),
                ..Default::default()
            }],
            total_count: 1,
        });
        tools.set_web(WebResearch {
            success: true,
            content: "[https://example.com] crawl content".into(),
            sources: vec!["https://example.com".into()],
            error: None,
        });
        tools
    }

    /// **Scenario**: round 1 stores both branches' results and records each
    /// tool once for the node (tool-side-effect honesty).
    #[tokio::test]
    async fn round1_stores_both_branches() {
        let tools = tools_with_docs();
        let node = Round1ParallelSearchNode {
            tools: tools.clone(),
        };
        let mut state = ResearchState::for_query("solar", "u1", SharedMemory::default(), false);
        state.expanded_queries = vec!["solar".into(), "solar panels".into()];
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.round1_results.contains("Solar Notes"));
        assert!(out.web_round1_results.contains("crawl content"));
        assert_eq!(
            out.shared_memory.previous_tools_used,
            vec!["search_documents", "search_and_crawl"]
        );
    }

    /// **Scenario**: a web-branch failure yields empty web results plus an
    /// error note; the local branch still lands.
    #[tokio::test]
    async fn round1_tolerates_web_failure() {
        let tools = tools_with_docs();
        tools.fail_op("search_and_crawl");
        let node = Round1ParallelSearchNode { tools };
        let state = ResearchState::for_query("solar", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert!(!out.round1_results.is_empty());
        assert!(out.web_round1_results.is_empty());
        assert!(out.error.contains("web search"));
    }

    /// **Scenario**: round 2 sufficiency is a >100-char content threshold.
    #[tokio::test]
    async fn round2_sufficiency_threshold() {
        let tools = tools_with_docs();
        let node = Round2GapFillingNode {
            tools: tools.clone(),
        };
        let mut state = ResearchState::for_query("solar", "u1", SharedMemory::default(), false);
        state.identified_gaps = vec!["inverter sizing".into()];
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.round2_sufficient);
        assert_eq!(route_from_round2(&out), "sufficient");

        let empty_tools = Arc::new(RecordingTools::default());
        let node = Round2GapFillingNode { tools: empty_tools };
        let state = ResearchState::for_query("solar", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert!(!out.round2_sufficient);
        assert_eq!(route_from_round2(&out), "needs_web");
    }

    /// **Scenario**: web round 2 targets the top web gap query when present.
    #[tokio::test]
    async fn web_round2_targets_gap_query() {
        let tools = tools_with_docs();
        let node = WebRound2Node {
            tools: tools.clone(),
        };
        let mut state = ResearchState::for_query("solar", "u1", SharedMemory::default(), false);
        state.web_identified_gaps = vec!["microinverter efficiency".into()];
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.web_round2_results.contains("crawl content"));
        assert_eq!(out.current_round, "web_round_2");
    }
}
