//! Conversation-cache gate: reuse fresh prior research instead of new I/O.

use std::sync::Arc;

use async_trait::async_trait;

use stategraph::{AgentError, Next, Node};

use crate::tools::ToolService;

use super::records::ResearchRound;
use super::state::ResearchState;

/// Cache entries older than this are ignored.
pub const CACHE_FRESHNESS_HOURS: u32 = 24;

pub struct CacheCheckNode {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Node<ResearchState> for CacheCheckNode {
    fn id(&self) -> &str {
        "cache_check"
    }

    async fn run(&self, mut state: ResearchState) -> Result<(ResearchState, Next), AgentError> {
        state.current_round = ResearchRound::CacheCheck.as_str().to_string();
        let conversation_id =
            (!state.conversation_id.is_empty()).then(|| state.conversation_id.clone());
        let lookup = self
            .tools
            .search_conversation_cache(
                &state.query,
                conversation_id.as_deref(),
                CACHE_FRESHNESS_HOURS,
                &state.user_id,
            )
            .await;
        state.shared_memory.record_tool("search_conversation_cache");

        match lookup {
            Ok(result) if result.cache_hit && !result.entries.is_empty() => {
                let mut lines = Vec::with_capacity(result.entries.len());
                for entry in &result.entries {
                    lines.push(format!("[{}]: {}", entry.agent_name, entry.content));
                }
                state.cached_context = lines.join("\n");
                state.cache_hit = true;
                tracing::info!(entries = result.entries.len(), "cache hit");
            }
            Ok(_) => {
                tracing::info!("cache miss - proceeding with research");
                state.cache_hit = false;
            }
            Err(e) => {
                // Tool failure degrades to a miss.
                tracing::warn!(error = %e, "conversation cache lookup failed");
                state.cache_hit = false;
            }
        }
        Ok((state, Next::Continue))
    }
}

/// Routes out of the cache gate.
pub fn route_from_cache(state: &ResearchState) -> String {
    if state.cache_hit {
        "use_cache".to_string()
    } else {
        "do_research".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RecordingTools;
    use crate::state::SharedMemory;
    use crate::tools::{CacheEntry, CacheLookup};

    /// **Scenario**: a fresh cache hit concatenates entries as
    /// `[agent]: content` lines and routes to synthesis-from-cache.
    #[tokio::test]
    async fn cache_hit_builds_context() {
        let tools = Arc::new(RecordingTools::default());
        tools.set_cache(CacheLookup {
            cache_hit: true,
            entries: vec![
                CacheEntry {
                    content: "earlier finding".into(),
                    agent_name: "full_research_agent".into(),
                    ..Default::default()
                },
                CacheEntry {
                    content: "second".into(),
                    agent_name: "chat".into(),
                    ..Default::default()
                },
            ],
        });
        let node = CacheCheckNode {
            tools: tools.clone(),
        };
        let state = ResearchState::for_query("q", "u1", SharedMemory::default(), false)
            .with_conversation("c1");
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.cache_hit);
        assert_eq!(
            out.cached_context,
            "[full_research_agent]: earlier finding\n[chat]: second"
        );
        assert_eq!(route_from_cache(&out), "use_cache");
        assert_eq!(
            out.shared_memory.previous_tools_used,
            vec!["search_conversation_cache"]
        );
    }

    /// **Scenario**: a miss (or tool failure) routes to full research.
    #[tokio::test]
    async fn cache_miss_routes_to_research() {
        let tools = Arc::new(RecordingTools::default());
        let node = CacheCheckNode { tools };
        let state = ResearchState::for_query("q", "u1", SharedMemory::default(), false);
        let (out, _) = node.run(state).await.unwrap();
        assert!(!out.cache_hit);
        assert_eq!(route_from_cache(&out), "do_research");
    }
}
