//! Project-capture HITL state machine, stateful across turns via
//! `shared_memory.pending_project_capture`.
//!
//! States: gathering → awaiting_confirmation → (committed | cancelled).

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use stategraph::{AgentError, Next, Node};

use crate::llm::{complete_json, LlmGateway, LlmRequest};
use crate::state::{PendingProjectCapture, TaskStatus};
use crate::tools::ToolService;

use super::preview::{build_preview_message, build_project_block};
use super::OrgState;

const MAX_STARTER_TASKS: usize = 5;

const CONFIRM_KEYWORDS: &[&str] = &["yes", "y", "ok", "okay", "proceed", "do it", "confirm"];
const CANCEL_KEYWORDS: &[&str] = &["no", "cancel", "stop", "abort"];

static ORG_TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\d{4}-\d{2}-\d{2} [A-Za-z]{3}>").expect("static regex"));

fn is_confirmation(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    CONFIRM_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_cancellation(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    CANCEL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Title from the opening message, with capture prefixes stripped.
fn extract_title(message: &str) -> String {
    let trimmed = message.trim();
    let lower = trimmed.to_lowercase();
    for prefix in ["start project", "create project", "new project", "project:"] {
        if lower.starts_with(prefix) {
            return trimmed[prefix.len()..].trim_matches([':', ' ']).to_string();
        }
    }
    trimmed.to_string()
}

/// Pulls `Description:` / `Tasks:` labelled sections, bulleted lines, and an
/// org `<YYYY-MM-DD Dow>` timestamp out of a follow-up message.
fn parse_followup(message: &str) -> (Option<String>, Vec<String>, Option<String>) {
    let mut description_lines: Vec<String> = Vec::new();
    let mut tasks: Vec<String> = Vec::new();
    let mut section: Option<&str> = None;

    for line in message.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();
        if lower.starts_with("description:") {
            section = Some("description");
            let rest = line["description:".len()..].trim();
            if !rest.is_empty() {
                description_lines.push(rest.to_string());
            }
            continue;
        }
        if lower.starts_with("tasks:") {
            section = Some("tasks");
            let rest = line["tasks:".len()..].trim();
            if !rest.is_empty() {
                if rest.contains(';') {
                    tasks.extend(rest.split(';').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));
                } else {
                    tasks.push(rest.to_string());
                }
            }
            continue;
        }
        if line.starts_with("- ") || line.starts_with("* ") {
            tasks.push(line[2..].trim().to_string());
            continue;
        }
        match section {
            Some("description") if !line.is_empty() => description_lines.push(line.to_string()),
            Some("tasks") if !line.is_empty() => tasks.push(line.to_string()),
            _ => {}
        }
    }

    let description = (!description_lines.is_empty()).then(|| description_lines.join(" "));
    let target_date = ORG_TIMESTAMP_RE
        .find(message)
        .map(|m| m.as_str().to_string());
    tasks.dedup();
    tasks.truncate(MAX_STARTER_TASKS);
    (description, tasks, target_date)
}

fn missing_fields(pending: &PendingProjectCapture) -> Vec<String> {
    let mut missing = Vec::new();
    if pending.description.trim().is_empty() {
        missing.push("description".to_string());
    }
    if pending.initial_tasks.is_empty() {
        missing.push("initial_tasks".to_string());
    }
    missing
}

fn clarification_question(missing: &[String]) -> String {
    format!(
        "Before I add this project, could you give me the missing pieces: {}? \
         You can reply with `Description: ...` and `Tasks: a; b; c`.",
        missing.join(", ")
    )
}

fn move_to_preview(pending: &mut PendingProjectCapture) -> String {
    let block = build_project_block(pending);
    pending.preview_block = block.clone();
    pending.awaiting_confirmation = true;
    build_preview_message(&block)
}

#[derive(Debug, Default, serde::Deserialize)]
struct CaptureEnrichment {
    #[serde(default)]
    description: String,
    #[serde(default)]
    initial_tasks: Vec<String>,
}

/// The project-capture node.
pub struct ProjectCaptureNode {
    pub llm: Arc<dyn LlmGateway>,
    pub tools: Arc<dyn ToolService>,
}

impl ProjectCaptureNode {
    async fn enrich(&self, title: &str, message: &str) -> CaptureEnrichment {
        let prompt = format!(
            r#"Enrich this project capture for an org-mode inbox.

PROJECT TITLE: {title}
USER MESSAGE: {message}

Write a one-to-two sentence description and up to {MAX_STARTER_TASKS} concrete starter tasks.

STRUCTURED OUTPUT REQUIRED - Respond with ONLY valid JSON matching this exact schema:
{{
    "description": "string",
    "initial_tasks": ["task", "..."]
}}"#
        );
        match complete_json::<CaptureEnrichment>(
            self.llm.as_ref(),
            LlmRequest::new(prompt)
                .with_system("You are an org-mode capture assistant. Always respond with valid JSON.")
                .with_temperature(0.3),
        )
        .await
        {
            Ok(mut enrichment) => {
                enrichment.initial_tasks.truncate(MAX_STARTER_TASKS);
                enrichment
            }
            Err(e) => {
                // Missing-field clarification will collect these instead.
                tracing::warn!(error = %e, "capture enrichment unparseable");
                CaptureEnrichment::default()
            }
        }
    }

    async fn open_capture(&self, state: &mut OrgState) {
        let title = extract_title(&state.query);
        let enrichment = self.enrich(&title, &state.query).await;
        let (description, tasks, target_date) = parse_followup(&state.query);

        let mut pending = PendingProjectCapture {
            title,
            description: description.unwrap_or(enrichment.description),
            target_date: target_date.unwrap_or_default(),
            tags: vec!["project".into()],
            initial_tasks: if tasks.is_empty() {
                enrichment.initial_tasks
            } else {
                tasks
            },
            ..Default::default()
        };
        pending.missing_fields = missing_fields(&pending);

        if pending.missing_fields.is_empty() {
            state.response = move_to_preview(&mut pending);
        } else {
            state.response = clarification_question(&pending.missing_fields);
        }
        state.task_status = TaskStatus::PermissionRequired;
        state.shared_memory.pending_project_capture = Some(pending);
    }

    async fn continue_gathering(&self, state: &mut OrgState, mut pending: PendingProjectCapture) {
        let (description, tasks, target_date) = parse_followup(&state.query);
        if let Some(d) = description {
            pending.description = d;
        }
        if !tasks.is_empty() {
            let mut merged = pending.initial_tasks.clone();
            for t in tasks {
                if !merged.contains(&t) {
                    merged.push(t);
                }
            }
            merged.truncate(MAX_STARTER_TASKS);
            pending.initial_tasks = merged;
        }
        if let Some(ts) = target_date {
            pending.target_date = ts;
        }
        pending.missing_fields = missing_fields(&pending);

        if pending.missing_fields.is_empty() {
            state.response = move_to_preview(&mut pending);
        } else {
            state.response = clarification_question(&pending.missing_fields);
        }
        state.task_status = TaskStatus::PermissionRequired;
        state.shared_memory.pending_project_capture = Some(pending);
    }

    async fn commit(&self, state: &mut OrgState, pending: &PendingProjectCapture) {
        let block = if pending.preview_block.is_empty() {
            build_project_block(pending)
        } else {
            pending.preview_block.clone()
        };
        let result = self.tools.append_org_inbox_text(&block, &state.user_id).await;
        state.shared_memory.record_tool("append_org_inbox_text");
        match result {
            Ok(r) if r.success => {
                state.response = format!("Project added to inbox: {}", pending.title);
                state.task_status = TaskStatus::Complete;
            }
            Ok(r) => {
                state.response = format!("Could not add the project: {}", r.message);
                state.task_status = TaskStatus::Error;
            }
            Err(e) => {
                tracing::warn!(error = %e, "inbox append failed");
                state.response = format!("Could not add the project: {}", e);
                state.task_status = TaskStatus::Error;
            }
        }
        // Committed or failed, the capture is finished.
        state.shared_memory.pending_project_capture = None;
    }
}

#[async_trait]
impl Node<OrgState> for ProjectCaptureNode {
    fn id(&self) -> &str {
        "project_capture"
    }

    async fn run(&self, mut state: OrgState) -> Result<(OrgState, Next), AgentError> {
        let pending = state.shared_memory.pending_project_capture.clone();
        match pending {
            None => self.open_capture(&mut state).await,
            Some(p) if p.awaiting_confirmation => {
                if is_cancellation(&state.query) {
                    state.shared_memory.pending_project_capture = None;
                    state.response = format!("Project capture cancelled: {}", p.title);
                    state.task_status = TaskStatus::Complete;
                } else if is_confirmation(&state.query) {
                    self.commit(&mut state, &p).await;
                } else {
                    // Treat the message as edits and rebuild the preview.
                    let mut p = p;
                    p.awaiting_confirmation = false;
                    self.continue_gathering(&mut state, p).await;
                }
            }
            Some(p) => self.continue_gathering(&mut state, p).await,
        }
        Ok((state, Next::Continue))
    }
}
