//! Query expansion: widen the search net before round 1.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{AgentError, Next, Node};

use crate::tools::ToolService;

use super::state::ResearchState;

pub const NUM_QUERY_VARIATIONS: u32 = 3;

pub struct QueryExpansionNode {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Node<ResearchState> for QueryExpansionNode {
    fn id(&self) -> &str {
        "query_expansion"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        let context = (!state.cached_context.is_empty()).then(|| state.cached_context.clone());
        let result = self
            .tools
            .expand_query(
                &state.query,
                NUM_QUERY_VARIATIONS,
                &state.user_id,
                context.as_deref(),
            )
            .await;
        state.shared_memory.record_tool("expand_query");

        match result {
            Ok(expansion) => {
                let mut queries = expansion.expanded_queries;
                // The original query always participates in round 1.
                if !queries.iter().any(|q| q == &state.query) {
                    queries.insert(0, state.query.clone());
                }
                state.expanded_queries = queries;
                state.key_entities = expansion.key_entities;
                tracing::info!(
                    expanded = state.expanded_queries.len(),
                    entities = state.key_entities.len(),
                    "query expanded"
                );
            }
            Err(e) => {
                // Boundary behavior: expansion failure degrades to the
                // original query alone; the graph still reaches synthesis.
                tracing::warn!(error = %e, "query expansion failed");
                state.expanded_queries = vec![state.query.clone()];
                state.key_entities = Vec::new();
            }
        }
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedMemory;
    use crate::tools::{QueryExpansion, RecordingTools};

    /// **Scenario**: expansion stores variations with the original query
    /// always included.
    #[tokio::test]
    async fn expansion_includes_original() {
        let tools = Arc::new(RecordingTools::default());
        tools.set_expansion(QueryExpansion {
            original_query: "solar balcony setup".into(),
            expanded_queries: vec![
                "balcony solar panel installation".into(),
                "small-scale photovoltaic setup".into(),
            ],
            key_entities: vec!["solar panel".into()],
            expansion_count: 2,
        });
        let node = QueryExpansionNode {
            tools: tools.clone(),
        };
        let state =
            ResearchState::for_query("solar balcony setup", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.expanded_queries.len(), 3);
        assert_eq!(out.expanded_queries[0], "solar balcony setup");
        assert_eq!(out.key_entities, vec!["solar panel"]);
        assert_eq!(out.shared_memory.previous_tools_used, vec!["expand_query"]);
    }

    /// **Scenario**: expansion failure falls back to `[original_query]` and
    /// empty entities.
    #[tokio::test]
    async fn expansion_failure_falls_back() {
        let tools = Arc::new(RecordingTools::default());
        tools.fail_op("expand_query");
        let node = QueryExpansionNode { tools };
        let state = ResearchState::for_query("q", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.expanded_queries, vec!["q"]);
        assert!(out.key_entities.is_empty());
    }
}
