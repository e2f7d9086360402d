//! Stream events emitted by `CompiledStateGraph::stream`.

/// One event per node transition during a streamed invocation.
///
/// `Interrupt` is emitted when execution halts at an interrupt-before node;
/// `Done` carries the final state; `Error` carries a failure message. A
/// stream ends after exactly one of `Interrupt`, `Done`, or `Error`.
#[derive(Debug, Clone)]
pub enum StreamEvent<S> {
    /// A node is about to execute.
    NodeStart { node_id: String },
    /// A node finished executing.
    NodeEnd { node_id: String },
    /// Full state after a node's update was applied.
    Values(S),
    /// Execution paused before the named node; a checkpoint was written.
    Interrupt { node_id: String },
    /// A checkpoint was written (after a node, at an interrupt, or at END).
    Checkpoint { checkpoint_id: String },
    /// The graph reached END; final state attached.
    Done(S),
    /// The invocation failed.
    Error(String),
}
