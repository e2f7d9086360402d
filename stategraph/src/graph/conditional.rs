//! Conditional edges: route to the next node based on state.
//!
//! A source node with conditional edges has a routing function
//! `(state) -> key`; the key is either used as the next node id directly or
//! looked up in an optional path map.
//!
//! **Interaction**: Stored by `StateGraph::add_conditional_edges`; resolved
//! by the `CompiledStateGraph` run loop after the source node completes.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Router function: takes a reference to state and returns a routing key.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge definition: routing function plus optional path map.
///
/// - `path_map` is `None`: the router's return value is the next node id.
/// - `path_map` is `Some(map)`: the next node id is `map[key]` when present,
///   otherwise the key itself (allowing direct node ids as keys).
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or END) from the current state.
    pub fn resolve_next(&self, state: &S) -> String {
        let key = (self.path)(state);
        self.path_map
            .as_ref()
            .and_then(|m| m.get(&key))
            .cloned()
            .unwrap_or(key)
    }
}

/// How to determine the next node after a given node runs.
///
/// `Unconditional(to_id)` for a single fixed edge; `Conditional(router)` when
/// the next node is decided from state at runtime (the node's own `Next` is
/// then ignored).
#[derive(Clone)]
pub enum NextEntry<S> {
    Unconditional(String),
    Conditional(ConditionalRouter<S>),
}
