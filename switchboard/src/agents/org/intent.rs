//! Org intent split: synthesis, project capture, or inbox management.

use serde::{Deserialize, Serialize};

use crate::state::{ActiveEditor, SharedMemory};

use super::links::parse_org_links;

/// Inbox management operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagementOp {
    Add,
    List,
    Toggle,
    Update,
    Schedule,
    ArchiveDone,
}

/// What this turn asks of the org agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgIntent {
    Synthesis,
    ProjectCapture,
    Management(ManagementOp),
}

const SYNTHESIS_KEYWORDS: &[&str] = &[
    "compare",
    "synthesize",
    "analyze",
    "based on",
    "using",
    "from the",
    "in the linked",
    "across",
    "between",
];

const CAPTURE_PREFIXES: &[&str] = &["start project", "create project", "new project", "project:"];

fn management_op(message: &str) -> ManagementOp {
    let lower = message.to_lowercase();
    if ["archive"].iter().any(|k| lower.contains(k)) {
        ManagementOp::ArchiveDone
    } else if ["schedule", "reschedule"].iter().any(|k| lower.contains(k)) {
        ManagementOp::Schedule
    } else if ["toggle", "mark done", "mark as done", "complete", "check off", "finished"]
        .iter()
        .any(|k| lower.contains(k))
    {
        ManagementOp::Toggle
    } else if ["update", "change", "rename", "edit item"].iter().any(|k| lower.contains(k)) {
        ManagementOp::Update
    } else if ["list", "show", "what's in", "whats in", "what is in"]
        .iter()
        .any(|k| lower.contains(k))
    {
        ManagementOp::List
    } else {
        ManagementOp::Add
    }
}

/// Classifies the turn. A pending project capture always continues as
/// capture; synthesis needs org links in the editor *and* a comparison
/// keyword, and wins over a `start project`-style prefix; everything else
/// is management, refined by keyword.
pub fn analyze_intent(
    message: &str,
    editor: Option<&ActiveEditor>,
    shared_memory: &SharedMemory,
) -> OrgIntent {
    if shared_memory.pending_project_capture.is_some() {
        return OrgIntent::ProjectCapture;
    }

    let lower = message.trim().to_lowercase();
    let has_links = editor
        .map(|e| !parse_org_links(&e.content).is_empty())
        .unwrap_or(false);
    if has_links && SYNTHESIS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return OrgIntent::Synthesis;
    }

    if CAPTURE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return OrgIntent::ProjectCapture;
    }

    OrgIntent::Management(management_op(message))
}
