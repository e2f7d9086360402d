//! Inbox management: direct dispatch to the org tool-service RPCs. The
//! `add` operation first runs an LLM to produce a strictly-typed capture
//! intent.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use stategraph::{AgentError, Next, Node};

use crate::llm::{complete_json, LlmGateway, LlmRequest};
use crate::state::TaskStatus;
use crate::tools::{OrgInboxNewItem, ToolService};

use super::intent::ManagementOp;
use super::OrgState;

static ITEM_REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));
static ORG_TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\d{4}-\d{2}-\d{2} [A-Za-z]{3}[^>]*>").expect("static regex"));

/// Strictly-typed intent for an inbox `add`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrgCaptureIntent {
    #[serde(default)]
    pub title: String,
    /// `todo`, `event`, `contact`, or `checkbox`.
    #[serde(default)]
    pub entry_kind: String,
    #[serde(default)]
    pub schedule: Option<String>,
    /// `+1w` / `.+1m` style repeater.
    #[serde(default)]
    pub repeater: Option<String>,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
    #[serde(default)]
    pub contact_properties: Option<serde_json::Value>,
    #[serde(default)]
    pub clarification_needed: bool,
    #[serde(default)]
    pub clarification_question: String,
    #[serde(default)]
    pub assistant_confirmation: String,
}

fn add_intent_prompt(message: &str) -> String {
    format!(
        r#"Turn this message into a structured org-mode inbox entry.

USER MESSAGE: {message}

STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{{
    "title": "string",
    "entry_kind": "todo" | "event" | "contact" | "checkbox",
    "schedule": "<YYYY-MM-DD Dow>" | null,
    "repeater": "+1w" | ".+1m" | null,
    "suggested_tags": ["up to 3 short tags"],
    "contact_properties": {{}} | null,
    "clarification_needed": boolean,
    "clarification_question": "string",
    "assistant_confirmation": "string"
}}"#
    )
}

pub struct ManagementNode {
    pub llm: Arc<dyn LlmGateway>,
    pub tools: Arc<dyn ToolService>,
}

impl ManagementNode {
    fn item_ref(message: &str) -> String {
        ITEM_REF_RE
            .find(message)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    async fn add(&self, state: &mut OrgState) {
        let intent = match complete_json::<OrgCaptureIntent>(
            self.llm.as_ref(),
            LlmRequest::new(add_intent_prompt(&state.query))
                .with_system("You are an org-mode capture assistant. Always respond with valid JSON.")
                .with_temperature(0.2),
        )
        .await
        {
            Ok(i) => i,
            Err(e) => {
                // Deterministic fallback: capture the raw message as a todo.
                tracing::warn!(error = %e, "add intent unparseable");
                OrgCaptureIntent {
                    title: state.query.clone(),
                    entry_kind: "todo".into(),
                    ..Default::default()
                }
            }
        };

        if intent.clarification_needed && !intent.clarification_question.is_empty() {
            state.response = intent.clarification_question;
            state.task_status = TaskStatus::Incomplete;
            return;
        }

        let mut tags = intent.suggested_tags;
        tags.truncate(3);
        let result = self
            .tools
            .add_org_inbox_item(
                OrgInboxNewItem {
                    title: intent.title.clone(),
                    entry_kind: if intent.entry_kind.is_empty() {
                        "todo".into()
                    } else {
                        intent.entry_kind
                    },
                    schedule: intent.schedule,
                    repeater: intent.repeater,
                    tags,
                    contact_properties: intent.contact_properties,
                },
                &state.user_id,
            )
            .await;
        state.shared_memory.record_tool("add_org_inbox_item");
        match result {
            Ok(r) if r.success => {
                state.response = if intent.assistant_confirmation.is_empty() {
                    format!("Added to inbox: {}", intent.title)
                } else {
                    intent.assistant_confirmation
                };
            }
            Ok(r) => {
                state.response = format!("Could not add the item: {}", r.message);
                state.task_status = TaskStatus::Error;
            }
            Err(e) => {
                state.response = format!("Could not add the item: {}", e);
                state.task_status = TaskStatus::Error;
            }
        }
    }

    async fn dispatch(&self, op: ManagementOp, state: &mut OrgState) {
        match op {
            ManagementOp::Add => self.add(state).await,
            ManagementOp::List => {
                let result = self.tools.list_org_inbox_items(&state.user_id).await;
                state.shared_memory.record_tool("list_org_inbox_items");
                match result {
                    Ok(list) if list.success => {
                        if list.items.is_empty() {
                            state.response = "Your inbox is empty.".into();
                        } else {
                            let lines: Vec<String> = list
                                .items
                                .iter()
                                .map(|i| {
                                    let schedule = i
                                        .schedule
                                        .as_deref()
                                        .map(|s| format!(" ({})", s))
                                        .unwrap_or_default();
                                    format!("{}. [{}] {}{}", i.index, i.state, i.text, schedule)
                                })
                                .collect();
                            state.response = format!("Inbox items:\n{}", lines.join("\n"));
                        }
                    }
                    _ => {
                        state.response = "Could not list inbox items.".into();
                        state.task_status = TaskStatus::Error;
                    }
                }
            }
            ManagementOp::Toggle => {
                let item_ref = Self::item_ref(&state.query);
                let result = self.tools.toggle_org_inbox_item(&item_ref, &state.user_id).await;
                state.shared_memory.record_tool("toggle_org_inbox_item");
                state.response = match result {
                    Ok(r) if r.success => format!("Toggled item {}.", item_ref),
                    _ => {
                        state.task_status = TaskStatus::Error;
                        format!("Could not toggle item {}.", item_ref)
                    }
                };
            }
            ManagementOp::Update => {
                let item_ref = Self::item_ref(&state.query);
                let result = self
                    .tools
                    .update_org_inbox_item(&item_ref, &state.query, &state.user_id)
                    .await;
                state.shared_memory.record_tool("update_org_inbox_item");
                state.response = match result {
                    Ok(r) if r.success => format!("Updated item {}.", item_ref),
                    _ => {
                        state.task_status = TaskStatus::Error;
                        format!("Could not update item {}.", item_ref)
                    }
                };
            }
            ManagementOp::Schedule => {
                let item_ref = Self::item_ref(&state.query);
                let schedule = ORG_TIMESTAMP_RE
                    .find(&state.query)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let result = self
                    .tools
                    .set_org_inbox_schedule(&item_ref, &schedule, &state.user_id)
                    .await;
                state.shared_memory.record_tool("set_org_inbox_schedule");
                state.response = match result {
                    Ok(r) if r.success => format!("Scheduled item {} for {}.", item_ref, schedule),
                    _ => {
                        state.task_status = TaskStatus::Error;
                        format!("Could not schedule item {}.", item_ref)
                    }
                };
            }
            ManagementOp::ArchiveDone => {
                let result = self.tools.archive_org_inbox_done(&state.user_id).await;
                state.shared_memory.record_tool("archive_org_inbox_done");
                state.response = match result {
                    Ok(r) if r.success => "Archived all done items.".into(),
                    _ => {
                        state.task_status = TaskStatus::Error;
                        "Could not archive done items.".into()
                    }
                };
            }
        }
    }
}

#[async_trait]
impl Node<OrgState> for ManagementNode {
    fn id(&self) -> &str {
        "management"
    }

    async fn run(&self, mut state: OrgState) -> Result<(OrgState, Next), AgentError> {
        let op = match state.intent {
            Some(super::intent::OrgIntent::Management(op)) => op,
            _ => ManagementOp::Add,
        };
        self.dispatch(op, &mut state).await;
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlm;
    use crate::tools::RecordingTools;

    /// **Scenario**: an `add` runs the typed intent and submits the item
    /// with its schedule and tags.
    #[tokio::test]
    async fn add_runs_typed_intent() {
        let llm = Arc::new(ScriptedLlm::always(
            r#"{"title": "Order capacitors", "entry_kind": "todo",
                "schedule": "<2026-08-07 Fri>", "repeater": null,
                "suggested_tags": ["electronics"], "contact_properties": null,
                "clarification_needed": false, "clarification_question": "",
                "assistant_confirmation": "Added 'Order capacitors' to your inbox."}"#,
        ));
        let tools = Arc::new(RecordingTools::default());
        let node = ManagementNode {
            llm,
            tools: tools.clone(),
        };
        let mut state = OrgState::for_query("remember to order capacitors by friday", "u1");
        state.intent = Some(super::super::intent::OrgIntent::Management(ManagementOp::Add));
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.response, "Added 'Order capacitors' to your inbox.");
        let items = tools.org_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Order capacitors");
        assert_eq!(items[0].schedule.as_deref(), Some("<2026-08-07 Fri>"));
        assert_eq!(items[0].tags, vec!["electronics"]);
    }

    /// **Scenario**: a clarification-needed intent asks instead of adding.
    #[tokio::test]
    async fn add_asks_for_clarification() {
        let llm = Arc::new(ScriptedLlm::always(
            r#"{"title": "", "entry_kind": "event", "clarification_needed": true,
                "clarification_question": "What day is the appointment?"}"#,
        ));
        let tools = Arc::new(RecordingTools::default());
        let node = ManagementNode {
            llm,
            tools: tools.clone(),
        };
        let mut state = OrgState::for_query("add my dentist appointment", "u1");
        state.intent = Some(super::super::intent::OrgIntent::Management(ManagementOp::Add));
        let (out, _) = node.run(state).await.unwrap();
        assert_eq!(out.response, "What day is the appointment?");
        assert!(tools.org_items().is_empty());
    }

    /// **Scenario**: list, toggle, and schedule dispatch to their RPCs and
    /// record the tool names.
    #[tokio::test]
    async fn management_dispatch() {
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let tools = Arc::new(RecordingTools::default());
        let node = ManagementNode {
            llm,
            tools: tools.clone(),
        };

        let mut state = OrgState::for_query("list my inbox", "u1");
        state.intent = Some(super::super::intent::OrgIntent::Management(ManagementOp::List));
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.response.contains("Inbox items:"));

        let mut state = OrgState::for_query("mark item 3 complete", "u1");
        state.intent = Some(super::super::intent::OrgIntent::Management(ManagementOp::Toggle));
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.response.contains("Toggled item 3"));

        let mut state = OrgState::for_query("schedule item 2 for <2026-08-10 Mon>", "u1");
        state.intent = Some(super::super::intent::OrgIntent::Management(
            ManagementOp::Schedule,
        ));
        let (out, _) = node.run(state).await.unwrap();
        assert!(out.response.contains("<2026-08-10 Mon>"));

        assert_eq!(
            tools.calls(),
            vec![
                "list_org_inbox_items",
                "toggle_org_inbox_item",
                "set_org_inbox_schedule"
            ]
        );
    }
}
