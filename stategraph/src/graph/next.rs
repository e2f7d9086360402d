//! Next-step result from a graph node: continue, jump, or end.

/// Next step after running a node.
///
/// - **Continue**: follow the registered edge from this node.
/// - **Node(id)**: jump to the given node.
/// - **End**: stop; return current state as final result.
///
/// **Interaction**: Returned by `Node::run`; consumed by
/// `CompiledStateGraph::invoke`. When the node has conditional edges, the
/// router decides and the node's `Next` is ignored.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    /// Follow the registered outgoing edge; if none, equivalent to End.
    Continue,
    /// Run the node with the given id next.
    Node(String),
    /// Stop and return the current state.
    End,
}
