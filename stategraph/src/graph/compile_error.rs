//! Errors raised by `StateGraph::compile`.

use thiserror::Error;

/// Validation failure while building the executable graph.
#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("edge references unknown node: {0}")]
    NodeNotFound(String),

    #[error("no edge from START")]
    MissingStart,

    #[error("no path reaches END")]
    MissingEnd,

    #[error("conditional path map references unknown node: {0}")]
    InvalidConditionalPathMap(String),

    #[error("node {0} has both an outgoing edge and conditional edges")]
    NodeHasBothEdgeAndConditional(String),

    #[error("interrupt_before references unknown node: {0}")]
    UnknownInterruptNode(String),

    #[error("invalid graph: {0}")]
    InvalidChain(String),
}
