//! Typed request/response records for the tool service operations.

use serde::{Deserialize, Serialize};

/// One document hit from `search_documents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentHit {
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_preview: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchDocumentsResult {
    #[serde(default)]
    pub results: Vec<DocumentHit>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Result of resolving a (possibly relative) path to a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathResolution {
    pub document_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub resolved_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFileRequest {
    pub filename: String,
    pub content: String,
    pub user_id: String,
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFileResult {
    pub success: bool,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub folder_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataUpdateResult {
    pub success: bool,
    #[serde(default)]
    pub updated_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResult {
    pub success: bool,
    #[serde(default)]
    pub content_length: u64,
}

/// One anchored editor operation. `pre_hash` commits to the pre-image;
/// mismatched hashes fail the edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorOperation {
    pub op_type: String,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pre_hash: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub anchor_text: String,
    #[serde(default)]
    pub left_context: String,
    #[serde(default)]
    pub right_context: String,
    #[serde(default)]
    pub occurrence_index: u32,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Edit proposal submitted for user preview. Lifecycle:
/// proposed → applied | rejected | expired.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditProposalRequest {
    pub document_id: String,
    /// `operations` or `content`.
    pub edit_type: String,
    #[serde(default)]
    pub operations: Vec<EditorOperation>,
    #[serde(default)]
    pub content_edit: Option<String>,
    pub agent_name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub requires_preview: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalResult {
    pub success: bool,
    #[serde(default)]
    pub proposal_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyDirectResult {
    pub success: bool,
    #[serde(default)]
    pub applied_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Combined search-then-crawl result used by the research rounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebResearch {
    pub success: bool,
    /// Concatenated page content of the crawled hits.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryExpansion {
    #[serde(default)]
    pub original_query: String,
    #[serde(default)]
    pub expanded_queries: Vec<String>,
    #[serde(default)]
    pub key_entities: Vec<String>,
    #[serde(default)]
    pub expansion_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub relevance_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheLookup {
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default)]
    pub entries: Vec<CacheEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleUpdate {
    pub success: bool,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub current_conditions: serde_json::Value,
    #[serde(default)]
    pub forecast: Vec<serde_json::Value>,
    #[serde(default)]
    pub alerts: Vec<serde_json::Value>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub num_images: u32,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedImages {
    pub success: bool,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub images: Vec<ImageFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartRequest {
    pub chart_type: String,
    /// Chart data as JSON.
    pub data: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub color_scheme: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub include_static: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartResult {
    pub success: bool,
    #[serde(default)]
    pub chart_type: String,
    #[serde(default)]
    pub output_format: String,
    #[serde(default)]
    pub chart_data: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// New inbox entry produced by the org capture intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgInboxNewItem {
    pub title: String,
    /// `todo`, `event`, `contact`, or `checkbox`.
    #[serde(default)]
    pub entry_kind: String,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub repeater: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contact_properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgActionResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgInboxEntry {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgInboxList {
    pub success: bool,
    #[serde(default)]
    pub items: Vec<OrgInboxEntry>,
}
