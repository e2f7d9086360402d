//! Project-content router: place an agent's free-form response into the
//! right project files and sections.
//!
//! Used by the project-oriented agents. Extraction → reference formatting →
//! classification → file routing → update-vs-append → submission, with the
//! frontmatter-preservation guard around every direct append.

mod classify;
mod extract;
mod format;
mod route;
mod update;

pub use classify::{classify_content, ContentType};
pub use extract::{extract_buckets, ContentBuckets, StructuredReturn};
pub use format::{format_as_reference, format_bucket};
pub use route::{
    candidates_from_editor, route_to_file, score_candidate, suggest_new_file, CandidateFile,
    NewFileSuggestion,
};
pub use update::{apply_section_content, find_section, is_placeholder, Placement};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;
use crate::frontmatter;
use crate::state::ActiveEditor;
use crate::tools::{EditProposalRequest, EditorOperation, ToolService};

/// Agents allowed to apply operations without a preview.
pub const AUTHORIZED_DIRECT_AGENTS: &[&str] =
    &["electronics_agent", "general_project_agent", "org_agent"];

/// Section names on the main project plan.
pub const CURRENT_STATE_SECTION: &str = "Current State";
pub const PLANS_SECTION: &str = "Recommendations and Plans";

/// How one routed block was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    /// Operations-based proposal for inline preview (document open in the
    /// editor).
    Proposal,
    /// Applied through `apply_operations_directly` (authorized agents).
    DirectOperations,
    /// Fallback full-content update.
    ContentUpdate,
}

/// One placed block of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedUpdate {
    pub target_filename: String,
    pub section: String,
    pub replaced: bool,
    pub submission: SubmissionKind,
}

/// Outcome of routing a whole agent response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub updates: Vec<RoutedUpdate>,
    pub suggestions: Vec<NewFileSuggestion>,
}

pub struct ProjectContentRouter {
    tools: Arc<dyn ToolService>,
}

impl ProjectContentRouter {
    pub fn new(tools: Arc<dyn ToolService>) -> Self {
        Self { tools }
    }

    fn parent_dir(canonical_path: &str) -> Option<&str> {
        let trimmed = canonical_path.trim_end_matches('/');
        trimmed.rfind('/').map(|idx| &trimmed[..idx])
    }

    /// Builds the single replace-document operation used by the proposal and
    /// direct-operations paths.
    fn replace_operation(original: &str, updated: &str, section: &str) -> EditorOperation {
        EditorOperation {
            op_type: "replace".into(),
            start: 0,
            end: original.len() as u64,
            text: updated.to_string(),
            original_text: original.to_string(),
            anchor_text: section.to_string(),
            note: format!("routed content for section '{}'", section),
            confidence: 0.9,
            ..Default::default()
        }
    }

    /// Submits an updated document: proposal when the document is open in
    /// the editor, direct operations for authorized agents, else a content
    /// update.
    async fn submit(
        &self,
        document_id: &str,
        filename: &str,
        original: &str,
        updated: &str,
        section: &str,
        placement: &Placement,
        open_in_editor: bool,
        editable: bool,
        agent_name: &str,
        user_id: &str,
    ) -> Result<SubmissionKind, OrchestratorError> {
        if open_in_editor && editable {
            let op = Self::replace_operation(original, updated, section);
            self.tools
                .propose_document_edit(EditProposalRequest {
                    document_id: document_id.to_string(),
                    edit_type: "operations".into(),
                    operations: vec![op],
                    content_edit: None,
                    agent_name: agent_name.to_string(),
                    summary: format!("Update '{}' in {}", section, filename),
                    requires_preview: true,
                    user_id: user_id.to_string(),
                })
                .await?;
            return Ok(SubmissionKind::Proposal);
        }

        if AUTHORIZED_DIRECT_AGENTS.contains(&agent_name) {
            let op = Self::replace_operation(original, updated, section);
            self.tools
                .apply_operations_directly(document_id, &[op], user_id, agent_name)
                .await?;
            return Ok(SubmissionKind::DirectOperations);
        }

        // Fallback content update. Appends go through the frontmatter guard.
        match placement {
            Placement::Appended => {
                let appended = updated
                    .strip_prefix(original.trim_end())
                    .unwrap_or(updated)
                    .to_string();
                self.append_preserving_frontmatter(document_id, user_id, &appended)
                    .await?;
            }
            Placement::Replaced => {
                self.tools
                    .update_document_content(document_id, updated, user_id, false)
                    .await?;
            }
        }
        Ok(SubmissionKind::ContentUpdate)
    }

    /// FM-1: append, then diff the frontmatter field sets and restore
    /// anything the append lost with a second update.
    pub async fn append_preserving_frontmatter(
        &self,
        document_id: &str,
        user_id: &str,
        appended: &str,
    ) -> Result<(), OrchestratorError> {
        let pre = self
            .tools
            .get_document_content(document_id, user_id)
            .await?
            .unwrap_or_default();

        self.tools
            .update_document_content(document_id, appended, user_id, true)
            .await?;

        let post = self
            .tools
            .get_document_content(document_id, user_id)
            .await?
            .unwrap_or_default();
        if let Some(repaired) = frontmatter::repair_lost_fields(&pre, &post) {
            self.tools
                .update_document_content(document_id, &repaired, user_id, false)
                .await?;
        }
        Ok(())
    }

    /// Routes a full agent response against the active editor's project.
    pub async fn route_response(
        &self,
        response_text: &str,
        structured: &StructuredReturn,
        editor: &ActiveEditor,
        agent_name: &str,
        user_id: &str,
    ) -> Result<RoutingOutcome, OrchestratorError> {
        let mut outcome = RoutingOutcome::default();
        let buckets = extract_buckets(response_text, structured);
        let base_path = Self::parent_dir(&editor.canonical_path);

        // The plan document itself.
        let plan = self
            .tools
            .find_document_by_path(&editor.canonical_path, user_id, None)
            .await?;
        let Some(plan) = plan else {
            tracing::warn!(path = %editor.canonical_path, "project plan did not resolve");
            return Ok(outcome);
        };
        let mut plan_content = self
            .tools
            .get_document_content(&plan.document_id, user_id)
            .await?
            .unwrap_or_else(|| editor.content.clone());
        let plan_keys_before = frontmatter::field_keys(&plan_content);

        // Current-state and plan sentences always land on the main plan.
        for (sentences, section) in [
            (&buckets.current_state, CURRENT_STATE_SECTION),
            (&buckets.new_plans, PLANS_SECTION),
        ] {
            if sentences.is_empty() {
                continue;
            }
            let block = format_bucket(sentences);
            let (updated, placement) = apply_section_content(&plan_content, section, &block);
            let submission = self
                .submit(
                    &plan.document_id,
                    &editor.filename,
                    &plan_content,
                    &updated,
                    section,
                    &placement,
                    true,
                    editor.is_editable,
                    agent_name,
                    user_id,
                )
                .await?;
            outcome.updates.push(RoutedUpdate {
                target_filename: editor.filename.clone(),
                section: section.to_string(),
                replaced: placement == Placement::Replaced,
                submission,
            });
            // Later sections see the earlier edits.
            plan_content = updated;
        }

        debug_assert!(
            frontmatter::field_keys(&plan_content).is_superset(&plan_keys_before),
            "plan frontmatter keys must be preserved"
        );

        // Typed buckets route to referenced files.
        for (items, fallback_type) in [
            (&buckets.components, ContentType::Component),
            (&buckets.code, ContentType::Code),
            (&buckets.calculations, ContentType::Specification),
        ] {
            if items.is_empty() {
                continue;
            }
            let block = format_bucket(items);
            let mut content_type = classify_content(&block);
            if block.len() < 40 {
                content_type = fallback_type;
            }

            // Architecture content pins to the main project plan.
            if content_type == ContentType::Architecture {
                let (updated, placement) =
                    apply_section_content(&plan_content, ContentType::Architecture.section(), &block);
                let submission = self
                    .submit(
                        &plan.document_id,
                        &editor.filename,
                        &plan_content,
                        &updated,
                        ContentType::Architecture.section(),
                        &placement,
                        true,
                        editor.is_editable,
                        agent_name,
                        user_id,
                    )
                    .await?;
                outcome.updates.push(RoutedUpdate {
                    target_filename: editor.filename.clone(),
                    section: ContentType::Architecture.section().to_string(),
                    replaced: placement == Placement::Replaced,
                    submission,
                });
                plan_content = updated;
                continue;
            }

            let candidates = candidates_from_editor(editor, content_type);
            let best = route_to_file(&candidates, content_type, &block);
            let same_type_score = best
                .as_ref()
                .filter(|(c, _)| c.referenced_context)
                .map(|(_, s)| *s)
                .unwrap_or(0.0);
            if let Some(suggestion) = suggest_new_file(&block, content_type, same_type_score) {
                outcome.suggestions.push(suggestion);
                continue;
            }
            let Some((target, _score)) = best else {
                continue;
            };

            // Resolve the referenced file relative to the plan.
            let relative = format!("./{}", target.filename);
            let resolution = match self
                .tools
                .find_document_by_path(&relative, user_id, base_path)
                .await?
            {
                Some(r) => r,
                None => {
                    tracing::warn!(path = %relative, "referenced file did not resolve");
                    continue;
                }
            };
            let existing = self
                .tools
                .get_document_content(&resolution.document_id, user_id)
                .await?
                .unwrap_or_default();
            let (updated, placement) =
                apply_section_content(&existing, content_type.section(), &block);
            let submission = self
                .submit(
                    &resolution.document_id,
                    &target.filename,
                    &existing,
                    &updated,
                    content_type.section(),
                    &placement,
                    false,
                    false,
                    agent_name,
                    user_id,
                )
                .await?;
            outcome.updates.push(RoutedUpdate {
                target_filename: target.filename,
                section: content_type.section().to_string(),
                replaced: placement == Placement::Replaced,
                submission,
            });
        }

        Ok(outcome)
    }
}
