//! Invoke config: thread_id, checkpoint_id, recursion limit, user_id.
//!
//! Passed to `CompiledStateGraph::invoke` / `stream` and to `Checkpointer`
//! implementations. When using a checkpointer, at least `thread_id` must be
//! provided.

/// Default bound on node executions per invocation.
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

/// Config for a single invoke. Identifies the thread and optional checkpoint.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Unique id for this conversation thread. Required with a checkpointer.
    pub thread_id: Option<String>,
    /// If set, load from this checkpoint instead of the latest (branching).
    pub checkpoint_id: Option<String>,
    /// Optional user id carried for stores and logging.
    pub user_id: Option<String>,
    /// Bound on node executions per invocation; `None` means the default (50).
    pub recursion_limit: Option<usize>,
}

impl RunnableConfig {
    /// Config for a thread with all other fields default.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    /// Effective recursion limit for this run.
    pub fn effective_recursion_limit(&self) -> usize {
        self.recursion_limit.unwrap_or(DEFAULT_RECURSION_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: default config has no thread and the 50-node limit.
    #[test]
    fn default_config() {
        let c = RunnableConfig::default();
        assert!(c.thread_id.is_none());
        assert!(c.checkpoint_id.is_none());
        assert_eq!(c.effective_recursion_limit(), DEFAULT_RECURSION_LIMIT);
    }

    /// **Scenario**: for_thread sets thread_id only; explicit limit wins.
    #[test]
    fn for_thread_and_explicit_limit() {
        let mut c = RunnableConfig::for_thread("u1:c1");
        assert_eq!(c.thread_id.as_deref(), Some("u1:c1"));
        c.recursion_limit = Some(7);
        assert_eq!(c.effective_recursion_limit(), 7);
    }
}
