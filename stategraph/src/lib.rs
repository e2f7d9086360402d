//! StateGraph: durable workflow graphs in Rust.
//!
//! A workflow is a directed graph of named nodes over a caller-defined state
//! type `S`. Nodes run one at a time; conditional edges route from state;
//! static interrupt-before points pause execution for human-in-the-loop
//! approval; a checkpointer persists `{values, next}` after every node so a
//! later invocation on the same thread resumes exactly where the previous one
//! halted.
//!
//! Build with [`graph::StateGraph`], execute with
//! [`graph::CompiledStateGraph::invoke`] or
//! [`graph::CompiledStateGraph::stream`].

pub mod channels;
pub mod error;
pub mod graph;
pub mod memory;
pub mod stream;

pub use channels::{BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater};
pub use error::AgentError;
pub use graph::{
    CompilationError, CompiledStateGraph, GraphInterrupt, Interrupt, Next, Node, StateGraph, END,
    START,
};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSource,
    Checkpointer, MemorySaver, RunnableConfig, SqliteSaver, StateSnapshot,
};
pub use stream::StreamEvent;
