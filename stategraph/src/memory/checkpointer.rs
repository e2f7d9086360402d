//! Checkpointer trait: durable per-thread snapshot storage.

use async_trait::async_trait;
use thiserror::Error;

use super::checkpoint::{Checkpoint, CheckpointListItem};
use super::config::RunnableConfig;

/// Checkpoint store failure.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("thread_id required in config")]
    ThreadIdRequired,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CheckpointError {
    fn from(e: serde_json::Error) -> Self {
        CheckpointError::Serialization(e.to_string())
    }
}

/// Durable per-thread snapshot store.
///
/// Writes are append-only versions per thread; `get_tuple` returns the
/// latest checkpoint, or the one named by `config.checkpoint_id` (branching
/// and retries open from a prior version).
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` via
/// `StateGraph::compile_with_checkpointer`.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync {
    /// Appends a checkpoint for `config.thread_id`; returns its id.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Fetches the checkpoint named by `config.checkpoint_id`, or the latest.
    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError>;

    /// Lists checkpoints for the thread, oldest first.
    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError>;
}
