//! Shared agent scaffolding: checkpoint config derivation, message-history
//! merge, datetime context, model selection.

use stategraph::RunnableConfig;

use crate::state::{ChatMessage, Role, TurnMetadata};

/// Checkpoint thread key: `"{user_id}:{conversation_id}"`.
pub fn thread_id(user_id: &str, conversation_id: &str) -> String {
    format!("{}:{}", user_id, conversation_id)
}

/// Derives the graph invoke config for a turn.
pub fn checkpoint_config(metadata: &TurnMetadata) -> RunnableConfig {
    RunnableConfig {
        thread_id: Some(metadata.thread_id()),
        user_id: Some(metadata.user_id.clone()),
        ..Default::default()
    }
}

/// Datetime context injected as a system line so agents reason about "now"
/// correctly.
pub fn datetime_context(timezone: &str) -> String {
    let now = chrono::Utc::now();
    format!(
        "Current date and time: {} UTC (user timezone: {}).",
        now.format("%A, %B %-d, %Y %H:%M"),
        timezone
    )
}

/// Merges the incoming query into the conversation history: appends it as a
/// user message unless it is already the latest entry.
pub fn merge_history(history: &[ChatMessage], query: &str) -> Vec<ChatMessage> {
    let mut merged: Vec<ChatMessage> = history.to_vec();
    let already_last = merged
        .last()
        .map(|m| m.role == Role::User && m.content == query)
        .unwrap_or(false);
    if !already_last {
        merged.push(ChatMessage::user(query));
    }
    merged
}
