//! Backend tool client: typed remote gateway to the external tool service.
//!
//! The orchestrator is a pure client of the tool service; every data-plane
//! operation (documents, web, weather, org inbox, cache, expansion, charts)
//! goes through the `ToolService` trait. The production implementation is
//! `BackendToolClient` (reqwest over one long-lived connection); tests use
//! recording doubles.

mod client;
pub mod recording;
mod types;

pub use client::{BackendToolClient, MAX_MESSAGE_BYTES};
pub use recording::RecordingTools;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Tool-layer failure. `Transport` feeds the orchestrator's single-shot
/// connection recovery; `Service` carries the structured `{code, details}`
/// pair of a logical failure.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("tool service error {code}: {details}")]
    Service { code: String, details: String },

    #[error("decode: {0}")]
    Decode(String),

    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),
}

impl ToolError {
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, ToolError::Transport(msg) if msg.contains("connection is closed"))
    }
}

/// Typed surface of the backend tool service (the service owns timeouts and
/// row-level security).
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Drops any pooled connection state so the next call dials fresh. Part
    /// of the orchestrator's single-shot recovery; a no-op for doubles.
    fn reset_connection(&self) {}

    // Documents
    async fn search_documents(
        &self,
        query: &str,
        user_id: &str,
        limit: u32,
    ) -> Result<SearchDocumentsResult, ToolError>;
    async fn get_document(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<DocumentInfo>, ToolError>;
    async fn get_document_content(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<String>, ToolError>;
    async fn find_document_by_path(
        &self,
        file_path: &str,
        user_id: &str,
        base_path: Option<&str>,
    ) -> Result<Option<PathResolution>, ToolError>;
    async fn create_user_file(
        &self,
        request: CreateFileRequest,
    ) -> Result<CreateFileResult, ToolError>;
    async fn update_document_metadata(
        &self,
        document_id: &str,
        user_id: &str,
        title: Option<&str>,
        frontmatter_type: Option<&str>,
    ) -> Result<MetadataUpdateResult, ToolError>;
    async fn update_document_content(
        &self,
        document_id: &str,
        content: &str,
        user_id: &str,
        append: bool,
    ) -> Result<UpdateResult, ToolError>;
    async fn propose_document_edit(
        &self,
        proposal: EditProposalRequest,
    ) -> Result<ProposalResult, ToolError>;
    async fn apply_operations_directly(
        &self,
        document_id: &str,
        operations: &[EditorOperation],
        user_id: &str,
        agent_name: &str,
    ) -> Result<ApplyDirectResult, ToolError>;

    // Web
    async fn search_web(
        &self,
        query: &str,
        max_results: u32,
        user_id: &str,
    ) -> Result<Vec<WebHit>, ToolError>;
    async fn crawl_web_content(
        &self,
        urls: &[String],
        user_id: &str,
    ) -> Result<Vec<CrawledPage>, ToolError>;
    /// Search then crawl the top hits; returns concatenated page content.
    async fn search_and_crawl(
        &self,
        query: &str,
        max_results: u32,
        user_id: &str,
    ) -> Result<WebResearch, ToolError>;

    // Research support
    async fn expand_query(
        &self,
        query: &str,
        num_variations: u32,
        user_id: &str,
        conversation_context: Option<&str>,
    ) -> Result<QueryExpansion, ToolError>;
    async fn search_conversation_cache(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        freshness_hours: u32,
        user_id: &str,
    ) -> Result<CacheLookup, ToolError>;
    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
        user_id: &str,
    ) -> Result<TitleUpdate, ToolError>;

    // Domain services
    async fn get_weather(
        &self,
        location: &str,
        user_id: &str,
        data_types: &[String],
        date_str: Option<&str>,
    ) -> Result<WeatherReport, ToolError>;
    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<GeneratedImages, ToolError>;
    async fn create_chart(&self, request: ChartRequest) -> Result<ChartResult, ToolError>;
    async fn analyze_text_content(
        &self,
        content: &str,
        include_advanced: bool,
        user_id: &str,
    ) -> Result<serde_json::Value, ToolError>;

    // Org inbox
    async fn add_org_inbox_item(
        &self,
        item: OrgInboxNewItem,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError>;
    async fn list_org_inbox_items(&self, user_id: &str) -> Result<OrgInboxList, ToolError>;
    async fn toggle_org_inbox_item(
        &self,
        item_ref: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError>;
    async fn update_org_inbox_item(
        &self,
        item_ref: &str,
        new_text: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError>;
    async fn set_org_inbox_schedule(
        &self,
        item_ref: &str,
        schedule: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError>;
    async fn archive_org_inbox_done(&self, user_id: &str) -> Result<OrgActionResult, ToolError>;
    async fn append_org_inbox_text(
        &self,
        text: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError>;
}
