//! Response chunks streamed back to the caller.

use serde::{Deserialize, Serialize};

/// Kind of a streamed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Status,
    Content,
    Warning,
    Error,
    Complete,
}

/// One streamed chunk of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub message: String,
    /// ISO 8601 timestamp of emission.
    pub timestamp: String,
    /// Agent that produced the chunk (`orchestrator`, `system`, or an agent name).
    pub agent_name: String,
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl ChatChunk {
    pub fn new(
        chunk_type: ChunkType,
        message: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            chunk_type,
            message: message.into(),
            timestamp: now_iso(),
            agent_name: agent_name.into(),
        }
    }

    pub fn status(message: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self::new(ChunkType::Status, message, agent_name)
    }

    pub fn content(message: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self::new(ChunkType::Content, message, agent_name)
    }

    pub fn warning(message: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self::new(ChunkType::Warning, message, agent_name)
    }

    pub fn error(message: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self::new(ChunkType::Error, message, agent_name)
    }

    pub fn complete(message: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self::new(ChunkType::Complete, message, agent_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: chunk type serializes as the lowercase wire tag under "type".
    #[test]
    fn chunk_serializes_with_type_tag() {
        let c = ChatChunk::status("Research agent processing...", "orchestrator");
        let v: serde_json::Value = serde_json::to_value(&c).unwrap();
        assert_eq!(v["type"], "status");
        assert_eq!(v["agent_name"], "orchestrator");
        assert!(v["timestamp"].as_str().unwrap().contains('T'));
    }

    /// **Scenario**: chunks round-trip through serde.
    #[test]
    fn chunk_roundtrip() {
        let c = ChatChunk::complete("done (status: complete)", "system");
        let json = serde_json::to_string(&c).unwrap();
        let back: ChatChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chunk_type, ChunkType::Complete);
        assert_eq!(back.message, c.message);
    }
}
