//! Graph execution error types.
//!
//! Used by `Node::run` and by the compiled graph run loop.

use thiserror::Error;

use crate::graph::GraphInterrupt;

/// Error returned by a node or by graph execution.
///
/// Interrupts travel as an error variant so the run loop can halt mid-graph;
/// callers treat `Interrupted` as a normal terminal condition of a turn, not
/// a failure.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A node failed (LLM call failed, tool error, bad state).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// More nodes executed in one invocation than the configured bound allows.
    #[error("FATAL: recursion limit {0} exceeded")]
    RecursionLimitExceeded(usize),

    /// Execution paused at an interrupt point; resume with the same thread_id.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}

impl AgentError {
    /// True when this is a paused-at-interrupt signal rather than a failure.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, AgentError::Interrupted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Interrupt;

    /// **Scenario**: Display of ExecutionFailed carries the message.
    #[test]
    fn execution_failed_display() {
        let err = AgentError::ExecutionFailed("boom".to_string());
        assert!(err.to_string().contains("execution failed"));
        assert!(err.to_string().contains("boom"));
    }

    /// **Scenario**: The recursion error message starts with the FATAL marker.
    #[test]
    fn recursion_limit_display_is_fatal() {
        let err = AgentError::RecursionLimitExceeded(50);
        assert!(err.to_string().starts_with("FATAL: recursion limit 50"));
    }

    /// **Scenario**: is_interrupt distinguishes interrupts from failures.
    #[test]
    fn is_interrupt_matches_only_interrupted() {
        let interrupt: AgentError =
            GraphInterrupt(Interrupt::before_node("web_round1")).into();
        assert!(interrupt.is_interrupt());
        assert!(!AgentError::ExecutionFailed("x".into()).is_interrupt());
    }
}
