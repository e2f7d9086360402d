//! Wire protocol for the orchestrator ingress.
//!
//! A backend calls StreamChat once per user message: one request in, an
//! ordered stream of chunks out. Exactly one `complete` chunk per successful
//! turn; exactly one `error` chunk on failure; `status` and `content` are
//! unbounded.

mod chunk;
mod request;

pub use chunk::{ChatChunk, ChunkType};
pub use request::{
    ActiveEditorPayload, ConversationTurn, FrontmatterPayload, PermissionGrants, Persona,
    PipelineContext, StreamChatRequest,
};
