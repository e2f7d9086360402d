//! Checkpoint types: a per-thread `{values, next}` snapshot.
//!
//! A checkpoint with a non-empty `next` set denotes a workflow paused at an
//! interrupt point; `next` holds the node(s) scheduled to execute when the
//! thread resumes.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Current version of the checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Source of a checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// Written from an input to invoke/stream.
    #[default]
    Input,
    /// Written from inside the run loop after a node.
    Loop,
    /// Written by an explicit `update_state` call.
    Update,
}

/// Metadata for a single checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// Step number within the invocation (-1 for input, 0+ for loop steps).
    pub step: i64,
    #[serde(skip)]
    pub created_at: Option<SystemTime>,
}

/// One checkpoint: state snapshot plus the nodes scheduled next.
///
/// **Interaction**: Produced by the run loop after every node; consumed by
/// `Checkpointer::put`, returned by `get_tuple`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    /// Checkpoint format version.
    pub v: u32,
    /// Unique id of this checkpoint within its thread.
    pub id: String,
    /// Milliseconds since epoch when the checkpoint was created.
    pub ts: String,
    /// The workflow state at the time of the checkpoint.
    pub values: S,
    /// Nodes scheduled to execute next; non-empty means paused/incomplete.
    pub next: Vec<String>,
    pub metadata: CheckpointMetadata,
}

/// Item returned by `Checkpointer::list` for history.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

/// Read-only view of a thread's latest checkpoint, as exposed by
/// `CompiledStateGraph::get_state`.
#[derive(Debug, Clone)]
pub struct StateSnapshot<S> {
    pub values: S,
    /// Non-empty when the thread is paused at an interrupt point.
    pub next: Vec<String>,
    pub checkpoint_id: String,
}

impl<S> StateSnapshot<S> {
    /// True when the snapshot denotes a workflow paused mid-graph.
    pub fn is_interrupted(&self) -> bool {
        !self.next.is_empty()
    }
}

impl<S> Checkpoint<S> {
    /// Creates a checkpoint from the current state and the nodes up next.
    pub fn from_state(values: S, next: Vec<String>, source: CheckpointSource, step: i64) -> Self {
        let now = SystemTime::now();
        let ts = now
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
            .to_string();
        Self {
            v: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            ts,
            values,
            next,
            metadata: CheckpointMetadata {
                source,
                step,
                created_at: Some(now),
            },
        }
    }
}
