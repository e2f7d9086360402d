//! Conversation state shared across turns and agents.
//!
//! Shared memory is a strongly-typed record: the recognized cross-turn keys
//! are first-class fields, with a small `extensions` map for forward
//! compatibility. It is carried in every workflow state and persisted at
//! each checkpoint; the orchestrator merges the checkpointed copy with a
//! fresh extraction from the incoming request before classification.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use chunk_stream::Persona;

/// Message role within a conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message of a conversation history, latest-last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Outcome of a turn as reported by an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Complete,
    Incomplete,
    /// The turn paused awaiting human approval (HITL).
    PermissionRequired,
    Error,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Complete => "complete",
            TaskStatus::Incomplete => "incomplete",
            TaskStatus::PermissionRequired => "permission_required",
            TaskStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// State of a permission gate. Consumed at HITL resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Pending,
    Granted,
}

/// A frontmatter custom-field value after stringified-list recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
    List(Vec<String>),
    Text(String),
}

impl CustomValue {
    /// The value as a list of referenced files, when it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            CustomValue::List(items) => Some(items),
            CustomValue::Text(_) => None,
        }
    }
}

/// Frontmatter of the document open in the editor, with custom fields
/// already recovered into lists where they were stringified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorFrontmatter {
    #[serde(default)]
    pub doc_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, CustomValue>,
}

/// Structured record of the document the user currently has open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveEditor {
    pub is_editable: bool,
    pub filename: String,
    /// Full filesystem path including the user-scoped prefix; preserved for
    /// resolving relative references (`./foo.md`, `../bar.org`).
    pub canonical_path: String,
    pub language: String,
    pub content: String,
    pub frontmatter: EditorFrontmatter,
    /// Cursor byte offset within `content`, when the editor reports one.
    #[serde(default)]
    pub cursor_offset: Option<usize>,
}

/// Output of the dynamic tool-needs analysis, surfaced in telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolAnalysis {
    pub core_tools: Vec<String>,
    pub conditional_tools: Vec<String>,
    pub categories: Vec<String>,
    pub reasoning: String,
}

/// Snapshot of an in-progress org project capture (HITL across turns).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingProjectCapture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub initial_tasks: Vec<String>,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub preview_block: String,
    #[serde(default)]
    pub awaiting_confirmation: bool,
}

/// Cross-turn mutable map carried in every workflow state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedMemory {
    /// Agent chosen on a previous turn; the classifier prefers continuity.
    #[serde(default)]
    pub primary_agent_selected: Option<String>,
    /// Last agent that responded.
    #[serde(default)]
    pub last_agent: Option<String>,
    /// Last assistant message (classifier context).
    #[serde(default)]
    pub last_response: Option<String>,
    #[serde(default)]
    pub active_editor: Option<ActiveEditor>,
    #[serde(default)]
    pub web_search_permission: Option<PermissionState>,
    #[serde(default)]
    pub web_crawl_permission: Option<PermissionState>,
    #[serde(default)]
    pub file_write_permission: Option<PermissionState>,
    #[serde(default)]
    pub external_api_permission: Option<PermissionState>,
    #[serde(default)]
    pub pending_project_capture: Option<PendingProjectCapture>,
    /// Tool names already invoked this turn, in invocation order.
    #[serde(default)]
    pub previous_tools_used: Vec<String>,
    #[serde(default)]
    pub tool_analysis: Option<ToolAnalysis>,
    /// User-selected edit target for editing agents.
    #[serde(default)]
    pub editor_preference: Option<String>,
    /// Forward-compatibility escape hatch for unrecognized keys.
    #[serde(default)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

fn merge_permission(
    current: Option<PermissionState>,
    incoming: Option<PermissionState>,
) -> Option<PermissionState> {
    match (current, incoming) {
        // Granted never silently reverts to pending.
        (Some(PermissionState::Granted), Some(PermissionState::Pending)) => {
            Some(PermissionState::Granted)
        }
        (cur, None) => cur,
        (_, inc) => inc,
    }
}

impl SharedMemory {
    /// Key-wise last-write-wins merge: a key present on `incoming` replaces
    /// the current value, except permission keys transitioning from
    /// `granted` back to `pending`, which keep `granted`.
    pub fn absorb(&mut self, incoming: &SharedMemory) {
        if incoming.primary_agent_selected.is_some() {
            self.primary_agent_selected = incoming.primary_agent_selected.clone();
        }
        if incoming.last_agent.is_some() {
            self.last_agent = incoming.last_agent.clone();
        }
        if incoming.last_response.is_some() {
            self.last_response = incoming.last_response.clone();
        }
        if incoming.active_editor.is_some() {
            self.active_editor = incoming.active_editor.clone();
        }
        self.web_search_permission =
            merge_permission(self.web_search_permission, incoming.web_search_permission);
        self.web_crawl_permission =
            merge_permission(self.web_crawl_permission, incoming.web_crawl_permission);
        self.file_write_permission =
            merge_permission(self.file_write_permission, incoming.file_write_permission);
        self.external_api_permission = merge_permission(
            self.external_api_permission,
            incoming.external_api_permission,
        );
        if incoming.pending_project_capture.is_some() {
            self.pending_project_capture = incoming.pending_project_capture.clone();
        }
        if !incoming.previous_tools_used.is_empty() {
            self.previous_tools_used = incoming.previous_tools_used.clone();
        }
        if incoming.tool_analysis.is_some() {
            self.tool_analysis = incoming.tool_analysis.clone();
        }
        if incoming.editor_preference.is_some() {
            self.editor_preference = incoming.editor_preference.clone();
        }
        for (k, v) in &incoming.extensions {
            self.extensions.insert(k.clone(), v.clone());
        }
    }

    /// Records a tool invocation for this turn (invariant: every tool
    /// invoked within a turn appears here once per node, in order).
    pub fn record_tool(&mut self, name: impl Into<String>) {
        self.previous_tools_used.push(name.into());
    }
}

/// Per-turn metadata assembled by the orchestrator and handed to agents.
#[derive(Debug, Clone, Default)]
pub struct TurnMetadata {
    pub user_id: String,
    pub conversation_id: String,
    pub persona: Persona,
    /// Explicit model override for this turn, when the user has one.
    pub model: Option<String>,
    pub shared_memory: SharedMemory,
    /// Initial state override for follow-up handling (e.g. skip the quick
    /// answer after an affirmative reply).
    pub skip_quick_answer: bool,
    pub extra: BTreeMap<String, String>,
}

impl TurnMetadata {
    /// Checkpoint thread key for this turn.
    pub fn thread_id(&self) -> String {
        format!("{}:{}", self.user_id, self.conversation_id)
    }
}
