//! Orchestrator error taxonomy.
//!
//! Kinds, not types: config problems degrade to warnings, transport problems
//! trigger the single-shot recovery, tool failures degrade to empty results,
//! LLM parse failures fall back deterministically at the call site, and only
//! a fatal workflow error surfaces to the caller as an error chunk.

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Required environment or persona missing; caller warns and proceeds
    /// with defaults where possible.
    #[error("config: {0}")]
    Config(String),

    /// Tool service unreachable or connection closed.
    #[error("transport: {0}")]
    Transport(String),

    /// Tool returned a logical failure.
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    /// LLM call failed outright (parse fallbacks are applied at call sites).
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    /// Exception escaped a node and recovery did not apply.
    #[error("workflow: {0}")]
    Workflow(String),
}

impl OrchestratorError {
    /// True when the single-shot connection recovery of the orchestrator
    /// should fire (reset the tool client, retry the turn exactly once).
    pub fn is_connection_closed(&self) -> bool {
        match self {
            OrchestratorError::Transport(msg) => msg.contains("connection is closed"),
            OrchestratorError::Tool(t) => t.is_connection_closed(),
            _ => false,
        }
    }
}

impl From<stategraph::AgentError> for OrchestratorError {
    fn from(e: stategraph::AgentError) -> Self {
        OrchestratorError::Workflow(e.to_string())
    }
}
