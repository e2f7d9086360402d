//! StreamChat request payload.
//!
//! Every field beyond `user_id`, `conversation_id`, and `query` is optional
//! on the wire; serde defaults keep partial requests parseable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_agent_type() -> String {
    "auto".to_string()
}

/// One turn of a conversation as sent by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Persona injected into agent prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub ai_name: String,
    pub persona_style: String,
    pub political_bias: String,
    pub timezone: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            ai_name: "Codex".into(),
            persona_style: "professional".into(),
            political_bias: "neutral".into(),
            timezone: "UTC".into(),
        }
    }
}

impl Persona {
    /// Fills empty fields with the defaults (request fields may be blank).
    pub fn with_defaults(mut self) -> Self {
        let d = Persona::default();
        if self.ai_name.is_empty() {
            self.ai_name = d.ai_name;
        }
        if self.persona_style.is_empty() {
            self.persona_style = d.persona_style;
        }
        if self.political_bias.is_empty() {
            self.political_bias = d.political_bias;
        }
        if self.timezone.is_empty() {
            self.timezone = d.timezone;
        }
        self
    }
}

/// Frontmatter of the document open in the user's editor. Custom fields
/// arrive as strings; list-shaped values are recovered downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontmatterPayload {
    #[serde(default, rename = "type")]
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
    pub custom_fields: BTreeMap<String, String>,
}

/// The document the user currently has open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEditorPayload {
    #[serde(default)]
    pub is_editable: bool,
    #[serde(default)]
    pub filename: String,
    /// Full filesystem path including the user-scoped prefix; required for
    /// resolving relative references like `./foo.md`.
    #[serde(default)]
    pub canonical_path: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub frontmatter: FrontmatterPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineContext {
    #[serde(default)]
    pub active_pipeline_id: String,
    #[serde(default)]
    pub pipeline_preference: String,
}

/// Permission grants carried on the request; `true` maps one-to-one to the
/// shared-memory key of the same name, unset means unchanged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PermissionGrants {
    #[serde(default)]
    pub web_search_permission: bool,
    #[serde(default)]
    pub web_crawl_permission: bool,
    #[serde(default)]
    pub file_write_permission: bool,
    #[serde(default)]
    pub external_api_permission: bool,
}

/// StreamChat request (orchestrator ingress).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChatRequest {
    pub user_id: String,
    pub conversation_id: String,
    pub query: String,
    /// `"auto"` routes through the intent classifier; any other value names
    /// an agent explicitly.
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default)]
    pub routing_reason: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub active_editor: Option<ActiveEditorPayload>,
    #[serde(default)]
    pub pipeline_context: Option<PipelineContext>,
    #[serde(default)]
    pub permission_grants: Option<PermissionGrants>,
    #[serde(default)]
    pub conversation_intelligence: Option<serde_json::Value>,
}

impl StreamChatRequest {
    /// Checkpoint thread key: `"{user_id}:{conversation_id}"`.
    pub fn thread_id(&self) -> String {
        format!("{}:{}", self.user_id, self.conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a minimal request parses; agent_type defaults to auto.
    #[test]
    fn minimal_request_parses() {
        let req: StreamChatRequest = serde_json::from_str(
            r#"{"user_id":"u1","conversation_id":"c1","query":"hello"}"#,
        )
        .unwrap();
        assert_eq!(req.agent_type, "auto");
        assert_eq!(req.thread_id(), "u1:c1");
        assert!(req.active_editor.is_none());
    }

    /// **Scenario**: blank persona fields fill from defaults.
    #[test]
    fn persona_with_defaults_fills_blanks() {
        let p = Persona {
            ai_name: String::new(),
            persona_style: "casual".into(),
            political_bias: String::new(),
            timezone: String::new(),
        }
        .with_defaults();
        assert_eq!(p.ai_name, "Codex");
        assert_eq!(p.persona_style, "casual");
        assert_eq!(p.political_bias, "neutral");
        assert_eq!(p.timezone, "UTC");
    }

    /// **Scenario**: active editor frontmatter custom fields parse as strings.
    #[test]
    fn editor_custom_fields_parse() {
        let req: StreamChatRequest = serde_json::from_str(
            r#"{
                "user_id":"u","conversation_id":"c","query":"q",
                "active_editor":{
                    "is_editable":true,
                    "filename":"plan.md",
                    "canonical_path":"/users/u/projects/plan.md",
                    "frontmatter":{"type":"project","custom_fields":{"files":"['./a.md', './b.md']"}}
                }
            }"#,
        )
        .unwrap();
        let editor = req.active_editor.unwrap();
        assert_eq!(editor.frontmatter.doc_type, "project");
        assert_eq!(
            editor.frontmatter.custom_fields.get("files").unwrap(),
            "['./a.md', './b.md']"
        );
    }
}
