//! Switchboard: a multi-agent LLM orchestrator.
//!
//! A long-running service that routes each user turn of a conversation to a
//! specialized agent, coordinates multi-round research with human-in-the-loop
//! checkpoints, and drives durable workflows over a persistent checkpoint
//! store (see the `stategraph` crate). The streaming ingress lives in the
//! `serve` crate; `Orchestrator::stream_chat` is the per-turn entry point.

pub mod agents;
pub mod base;
pub mod classifier;
pub mod content;
pub mod editor;
pub mod error;
pub mod frontmatter;
pub mod llm;
pub mod service;
pub mod state;
pub mod tools;

pub use error::OrchestratorError;
pub use service::Orchestrator;
pub use state::{
    ActiveEditor, ChatMessage, PendingProjectCapture, PermissionState, Role, SharedMemory,
    TaskStatus, ToolAnalysis, TurnMetadata,
};
