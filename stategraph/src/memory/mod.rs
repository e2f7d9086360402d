//! Checkpoint persistence: config, checkpoint types, and savers.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod sqlite_saver;

pub use checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource, StateSnapshot,
    CHECKPOINT_VERSION,
};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::{RunnableConfig, DEFAULT_RECURSION_LIMIT};
pub use memory_saver::MemorySaver;
pub use sqlite_saver::SqliteSaver;
