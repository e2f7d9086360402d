//! Agents: one workflow per user turn, behind a uniform contract.
//!
//! Agent selection is table-driven: a flat registry maps canonical names to
//! handles, and a secondary alias table collapses not-yet-migrated agent
//! types onto migrated ones. Unknown types fall back to `chat`.

pub mod chat;
pub mod formatting;
pub mod image;
pub mod org;
pub mod research;
pub mod weather;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OrchestratorError;
use crate::state::{ChatMessage, TaskStatus, TurnMetadata};

/// Canonical name of the fallback agent.
pub const CHAT_AGENT: &str = "chat";

/// What an agent returns for one turn.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub response: String,
    pub task_status: TaskStatus,
    /// Agent-specific extras surfaced in telemetry (sources, flags).
    pub agent_results: Value,
}

impl AgentReply {
    pub fn complete(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            task_status: TaskStatus::Complete,
            agent_results: Value::Null,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task_status = status;
        self
    }

    pub fn with_results(mut self, results: Value) -> Self {
        self.agent_results = results;
        self
    }
}

/// One agent: serves one user turn.
///
/// **Interaction**: Registered in `AgentRegistry`; dispatched by the
/// orchestrator with the merged turn context.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn process(
        &self,
        query: &str,
        metadata: &TurnMetadata,
        history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError>;
}

/// Alias table: unmigrated or shorthand agent types remapped onto canonical
/// registry names. Configuration, not conditionals.
pub const AGENT_ALIASES: &[(&str, &str)] = &[
    ("research", "full_research_agent"),
    ("full_research", "full_research_agent"),
    ("website_crawler_agent", "full_research_agent"),
    ("org", "org_agent"),
    ("org_inbox", "org_agent"),
    ("org_inbox_agent", "org_agent"),
    ("org_project_agent", "org_agent"),
    ("data_formatting", "data_formatting_agent"),
    ("pipeline_agent", "data_formatting_agent"),
    ("weather", "weather_agent"),
    ("image_generation", "image_generation_agent"),
    ("chat_agent", "chat"),
    // Unmigrated agents map to the closest available one.
    ("podcast_script_agent", "chat"),
    ("substack_agent", "chat"),
    ("proofreading_agent", "chat"),
    ("rss_agent", "chat"),
    ("entertainment_agent", "chat"),
    ("electronics_agent", "chat"),
    ("combined_proofread_and_analyze", "chat"),
];

/// Flat registry: canonical name → agent handle.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    /// Applies the alias table. Returns the canonical name plus whether the
    /// requested type was unknown (caller warns and falls back to chat).
    pub fn canonicalize(&self, agent_type: &str) -> (String, bool) {
        if self.agents.contains_key(agent_type) {
            return (agent_type.to_string(), false);
        }
        if let Some((_, to)) = AGENT_ALIASES.iter().find(|(from, _)| *from == agent_type) {
            return (to.to_string(), false);
        }
        (CHAT_AGENT.to_string(), true)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }
}
