//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S`, returns updated `S` and `Next`. The returned state is
//! merged into the current state by the graph's `StateUpdater`, so a node
//! only needs to touch the fields it owns.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

use super::Next;

/// One step in a graph: state in, (state out, next step).
///
/// **Interaction**: Registered with `StateGraph::add_node`; executed by
/// `CompiledStateGraph`. Routing after a node follows conditional edges when
/// present, otherwise the returned `Next`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"cache_check"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    async fn run(&self, state: S) -> Result<(S, Next), AgentError>;
}

/// Wraps an async closure as a node. Convenient for small nodes and tests.
pub struct FnNode<S, F> {
    id: String,
    f: F,
    _marker: std::marker::PhantomData<fn(S)>,
}

impl<S, F, Fut> FnNode<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(S, Next), AgentError>> + Send,
{
    pub fn new(id: impl Into<String>, f: F) -> Self {
        Self {
            id: id.into(),
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(S, Next), AgentError>> + Send,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: S) -> Result<(S, Next), AgentError> {
        (self.f)(state).await
    }
}
