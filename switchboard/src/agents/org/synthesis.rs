//! Synthesis path: resolve the filtered links to document content, assess
//! project documents, and synthesize an analysis across them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stategraph::{AgentError, Next, Node};

use crate::llm::{LlmGateway, LlmRequest};
use crate::tools::ToolService;

use super::OrgState;

/// Characters of each document fed to the synthesis prompt.
const SYNTHESIS_SLICE_CHARS: usize = 2000;

fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A referenced document with its fetched content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub file_path: String,
    pub resolved_path: String,
    pub heading: Option<String>,
    pub content: String,
    /// Project assessment text, present for project-typed documents.
    #[serde(default)]
    pub assessment: Option<String>,
}

fn parent_dir(canonical_path: &str) -> Option<&str> {
    let trimmed = canonical_path.trim_end_matches('/');
    trimmed.rfind('/').map(|idx| &trimmed[..idx])
}

/// Resolves each kept link through the tool service. Unresolvable paths are
/// dropped with a warning.
pub struct ResolveReferencesNode {
    pub tools: Arc<dyn ToolService>,
    pub llm: Arc<dyn LlmGateway>,
}

impl ResolveReferencesNode {
    async fn assess_project(&self, path: &str, content: &str) -> Option<String> {
        let prompt = format!(
            "Assess the current state of this project document: key goals, progress so far, and \
             the most important open items. Two or three sentences.\n\nDOCUMENT ({path}):\n{}",
            clip(content, SYNTHESIS_SLICE_CHARS)
        );
        match self
            .llm
            .complete(LlmRequest::new(prompt).with_temperature(0.3))
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "project assessment failed");
                None
            }
        }
    }
}

#[async_trait]
impl Node<OrgState> for ResolveReferencesNode {
    fn id(&self) -> &str {
        "resolve_references"
    }

    async fn run(&self, mut state: OrgState) -> Result<(OrgState, Next), AgentError> {
        let base_path = state
            .shared_memory
            .active_editor
            .as_ref()
            .and_then(|e| parent_dir(&e.canonical_path))
            .map(String::from);

        let mut resolved = Vec::new();
        for link in &state.links {
            let resolution = match self
                .tools
                .find_document_by_path(&link.file_path, &state.user_id, base_path.as_deref())
                .await
            {
                Ok(Some(r)) => r,
                Ok(None) => {
                    tracing::warn!(path = %link.file_path, "referenced file did not resolve");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %link.file_path, error = %e, "path resolution failed");
                    continue;
                }
            };
            let content = match self
                .tools
                .get_document_content(&resolution.document_id, &state.user_id)
                .await
            {
                Ok(Some(c)) => c,
                _ => {
                    tracing::warn!(path = %link.file_path, "referenced file has no content");
                    continue;
                }
            };

            // Project-typed documents get an up-front assessment folded into
            // the synthesis context.
            let is_project = content.contains("type: project")
                || resolution.resolved_path.contains("/projects/");
            let assessment = if is_project {
                self.assess_project(&resolution.resolved_path, &content).await
            } else {
                None
            };

            resolved.push(ResolvedReference {
                file_path: link.file_path.clone(),
                resolved_path: resolution.resolved_path,
                heading: link.heading.clone(),
                content,
                assessment,
            });
        }
        state.shared_memory.record_tool("find_document_by_path");
        state.shared_memory.record_tool("get_document_content");
        state.referenced_content = resolved;
        Ok((state, Next::Continue))
    }
}

/// Synthesizes the analysis from the primary editor plus each referenced
/// file.
pub struct SynthesizeAnalysisNode {
    pub llm: Arc<dyn LlmGateway>,
}

#[async_trait]
impl Node<OrgState> for SynthesizeAnalysisNode {
    fn id(&self) -> &str {
        "synthesize_analysis"
    }

    async fn run(&self, mut state: OrgState) -> Result<(OrgState, Next), AgentError> {
        let mut parts = Vec::new();
        if let Some(editor) = &state.shared_memory.active_editor {
            parts.push(format!(
                "PRIMARY DOCUMENT ({}):\n{}",
                editor.filename,
                clip(&editor.content, SYNTHESIS_SLICE_CHARS)
            ));
        }
        for reference in &state.referenced_content {
            parts.push(format!(
                "REFERENCED FILE ({}):\n{}",
                reference.resolved_path,
                clip(&reference.content, SYNTHESIS_SLICE_CHARS)
            ));
            if let Some(assessment) = &reference.assessment {
                parts.push(format!(
                    "PROJECT ASSESSMENT ({}):\n{}",
                    reference.resolved_path, assessment
                ));
            }
        }

        let prompt = format!(
            "Analyze the user's request against the documents below and answer it directly, \
             drawing comparisons across the files where relevant.\n\nREQUEST: {}\n\n{}",
            state.query,
            parts.join("\n\n")
        );
        match self
            .llm
            .complete(LlmRequest::new(prompt).with_temperature(0.3))
            .await
        {
            Ok(analysis) => {
                state.response = analysis;
            }
            Err(e) => {
                tracing::error!(error = %e, "org synthesis failed");
                state.response = format!("Analysis failed: {}", e);
                state.error = e.to_string();
            }
        }
        Ok((state, Next::Continue))
    }
}
