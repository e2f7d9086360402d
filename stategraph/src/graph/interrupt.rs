//! Interrupt mechanism for graph execution.
//!
//! Supports pausing a graph for human-in-the-loop approval. An interrupt is
//! raised either statically (a node listed in the graph's interrupt-before
//! set is reached) or dynamically (a node returns `AgentError::Interrupted`).
//! In both cases the engine checkpoints `{values, next}` first, so a later
//! invocation on the same thread resumes at the paused node.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interrupt value raised during graph execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interrupt {
    /// The node that was about to run when execution paused.
    pub node_id: String,
    /// Optional payload describing what approval is awaited.
    pub value: serde_json::Value,
}

impl Interrupt {
    /// Interrupt raised by the engine before executing `node_id`.
    pub fn before_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            value: serde_json::Value::Null,
        }
    }

    /// Interrupt with an explicit payload.
    pub fn with_value(node_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            node_id: node_id.into(),
            value,
        }
    }
}

/// Error wrapper carried through `AgentError::Interrupted`.
#[derive(Debug, Clone, Error)]
#[error("paused before node {}", .0.node_id)]
pub struct GraphInterrupt(pub Interrupt);

impl From<Interrupt> for GraphInterrupt {
    fn from(interrupt: Interrupt) -> Self {
        GraphInterrupt(interrupt)
    }
}
