//! Production tool client: one long-lived HTTP connection to the backend
//! tool service.
//!
//! Each operation POSTs a JSON argument object to `{base}/api/tools/{op}`
//! and decodes a typed response. Errors arrive as `{code, details}` bodies
//! and are translated into the `ToolError` taxonomy. The client is shared
//! across turns and tasks; `reset()` drops the pooled connections after a
//! "connection is closed" failure so the next call dials fresh.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::types::*;
use super::{ToolError, ToolService};

/// Message size limit per direction (mirrors the service's channel options).
pub const MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

#[derive(serde::Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    details: String,
}

/// Typed gateway to the backend tool service.
pub struct BackendToolClient {
    http: RwLock<reqwest::Client>,
    base_url: String,
}

impl BackendToolClient {
    /// Client against `BACKEND_TOOL_SERVICE_HOST`/`PORT` from the environment.
    pub fn from_env() -> Self {
        Self::new(config::tool_service_url())
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: RwLock::new(reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }

    /// Drops pooled connections; used by the orchestrator's single-shot
    /// recovery after a "connection is closed" failure.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.http.write() {
            *guard = reqwest::Client::new();
        }
    }

    fn client(&self) -> reqwest::Client {
        self.http
            .read()
            .map(|g| g.clone())
            .unwrap_or_else(|_| reqwest::Client::new())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        op: &str,
        args: serde_json::Value,
    ) -> Result<T, ToolError> {
        let body = serde_json::to_vec(&args).map_err(|e| ToolError::Decode(e.to_string()))?;
        if body.len() > MAX_MESSAGE_BYTES {
            return Err(ToolError::MessageTooLarge(body.len()));
        }
        let url = format!("{}/api/tools/{}", self.base_url, op);
        debug!(op, bytes = body.len(), "tool call");

        let response = self
            .client()
            .post(&url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        if bytes.len() > MAX_MESSAGE_BYTES {
            return Err(ToolError::MessageTooLarge(bytes.len()));
        }
        if !status.is_success() {
            let err: ServiceErrorBody = serde_json::from_slice(&bytes).unwrap_or(ServiceErrorBody {
                code: status.as_u16().to_string(),
                details: String::from_utf8_lossy(&bytes).into_owned(),
            });
            warn!(op, code = %err.code, "tool service error");
            return Err(ToolError::Service {
                code: err.code,
                details: err.details,
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| ToolError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ToolService for BackendToolClient {
    fn reset_connection(&self) {
        self.reset();
    }

    async fn search_documents(
        &self,
        query: &str,
        user_id: &str,
        limit: u32,
    ) -> Result<SearchDocumentsResult, ToolError> {
        self.call(
            "search_documents",
            json!({"query": query, "user_id": user_id, "limit": limit}),
        )
        .await
    }

    async fn get_document(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<DocumentInfo>, ToolError> {
        self.call(
            "get_document",
            json!({"document_id": document_id, "user_id": user_id}),
        )
        .await
    }

    async fn get_document_content(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<String>, ToolError> {
        #[derive(serde::Deserialize)]
        struct Body {
            #[serde(default)]
            content: Option<String>,
        }
        let body: Body = self
            .call(
                "get_document_content",
                json!({"document_id": document_id, "user_id": user_id}),
            )
            .await?;
        Ok(body.content)
    }

    async fn find_document_by_path(
        &self,
        file_path: &str,
        user_id: &str,
        base_path: Option<&str>,
    ) -> Result<Option<PathResolution>, ToolError> {
        self.call(
            "find_document_by_path",
            json!({"file_path": file_path, "user_id": user_id, "base_path": base_path}),
        )
        .await
    }

    async fn create_user_file(
        &self,
        request: CreateFileRequest,
    ) -> Result<CreateFileResult, ToolError> {
        let args = serde_json::to_value(&request).map_err(|e| ToolError::Decode(e.to_string()))?;
        self.call("create_user_file", args).await
    }

    async fn update_document_metadata(
        &self,
        document_id: &str,
        user_id: &str,
        title: Option<&str>,
        frontmatter_type: Option<&str>,
    ) -> Result<MetadataUpdateResult, ToolError> {
        self.call(
            "update_document_metadata",
            json!({
                "document_id": document_id,
                "user_id": user_id,
                "title": title,
                "frontmatter_type": frontmatter_type,
            }),
        )
        .await
    }

    async fn update_document_content(
        &self,
        document_id: &str,
        content: &str,
        user_id: &str,
        append: bool,
    ) -> Result<UpdateResult, ToolError> {
        self.call(
            "update_document_content",
            json!({
                "document_id": document_id,
                "content": content,
                "user_id": user_id,
                "append": append,
            }),
        )
        .await
    }

    async fn propose_document_edit(
        &self,
        proposal: EditProposalRequest,
    ) -> Result<ProposalResult, ToolError> {
        let args = serde_json::to_value(&proposal).map_err(|e| ToolError::Decode(e.to_string()))?;
        self.call("propose_document_edit", args).await
    }

    async fn apply_operations_directly(
        &self,
        document_id: &str,
        operations: &[EditorOperation],
        user_id: &str,
        agent_name: &str,
    ) -> Result<ApplyDirectResult, ToolError> {
        self.call(
            "apply_operations_directly",
            json!({
                "document_id": document_id,
                "operations": operations,
                "user_id": user_id,
                "agent_name": agent_name,
            }),
        )
        .await
    }

    async fn search_web(
        &self,
        query: &str,
        max_results: u32,
        user_id: &str,
    ) -> Result<Vec<WebHit>, ToolError> {
        self.call(
            "search_web",
            json!({"query": query, "max_results": max_results, "user_id": user_id}),
        )
        .await
    }

    async fn crawl_web_content(
        &self,
        urls: &[String],
        user_id: &str,
    ) -> Result<Vec<CrawledPage>, ToolError> {
        self.call(
            "crawl_web_content",
            json!({"urls": urls, "user_id": user_id}),
        )
        .await
    }

    async fn search_and_crawl(
        &self,
        query: &str,
        max_results: u32,
        user_id: &str,
    ) -> Result<WebResearch, ToolError> {
        let hits = self.search_web(query, max_results, user_id).await?;
        if hits.is_empty() {
            return Ok(WebResearch {
                success: true,
                ..Default::default()
            });
        }
        let urls: Vec<String> = hits.iter().map(|h| h.url.clone()).take(5).collect();
        let pages = self.crawl_web_content(&urls, user_id).await?;
        let mut content = String::new();
        let mut sources = Vec::new();
        for page in &pages {
            if page.content.is_empty() {
                continue;
            }
            if !content.is_empty() {
                content.push_str("\n\n");
            }
            content.push_str(&format!("[{}] {}\n{}", page.url, page.title, page.content));
            sources.push(page.url.clone());
        }
        // Snippets still carry signal when crawling came back empty.
        if content.is_empty() {
            for hit in &hits {
                if hit.snippet.is_empty() {
                    continue;
                }
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&format!("[{}] {}", hit.url, hit.snippet));
                sources.push(hit.url.clone());
            }
        }
        Ok(WebResearch {
            success: true,
            content,
            sources,
            error: None,
        })
    }

    async fn expand_query(
        &self,
        query: &str,
        num_variations: u32,
        user_id: &str,
        conversation_context: Option<&str>,
    ) -> Result<QueryExpansion, ToolError> {
        self.call(
            "expand_query",
            json!({
                "query": query,
                "num_variations": num_variations,
                "user_id": user_id,
                "conversation_context": conversation_context,
            }),
        )
        .await
    }

    async fn search_conversation_cache(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        freshness_hours: u32,
        user_id: &str,
    ) -> Result<CacheLookup, ToolError> {
        self.call(
            "search_conversation_cache",
            json!({
                "query": query,
                "conversation_id": conversation_id,
                "freshness_hours": freshness_hours,
                "user_id": user_id,
            }),
        )
        .await
    }

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
        user_id: &str,
    ) -> Result<TitleUpdate, ToolError> {
        self.call(
            "update_conversation_title",
            json!({"conversation_id": conversation_id, "title": title, "user_id": user_id}),
        )
        .await
    }

    async fn get_weather(
        &self,
        location: &str,
        user_id: &str,
        data_types: &[String],
        date_str: Option<&str>,
    ) -> Result<WeatherReport, ToolError> {
        self.call(
            "get_weather",
            json!({
                "location": location,
                "user_id": user_id,
                "data_types": data_types,
                "date_str": date_str,
            }),
        )
        .await
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImages, ToolError> {
        let args = serde_json::to_value(&request).map_err(|e| ToolError::Decode(e.to_string()))?;
        self.call("generate_image", args).await
    }

    async fn create_chart(&self, request: ChartRequest) -> Result<ChartResult, ToolError> {
        let args = serde_json::to_value(&request).map_err(|e| ToolError::Decode(e.to_string()))?;
        self.call("create_chart", args).await
    }

    async fn analyze_text_content(
        &self,
        content: &str,
        include_advanced: bool,
        user_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        self.call(
            "analyze_text_content",
            json!({
                "content": content,
                "include_advanced": include_advanced,
                "user_id": user_id,
            }),
        )
        .await
    }

    async fn add_org_inbox_item(
        &self,
        item: OrgInboxNewItem,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        let mut args = serde_json::to_value(&item).map_err(|e| ToolError::Decode(e.to_string()))?;
        if let Some(obj) = args.as_object_mut() {
            obj.insert("user_id".into(), json!(user_id));
        }
        self.call("add_org_inbox_item", args).await
    }

    async fn list_org_inbox_items(&self, user_id: &str) -> Result<OrgInboxList, ToolError> {
        self.call("list_org_inbox_items", json!({"user_id": user_id}))
            .await
    }

    async fn toggle_org_inbox_item(
        &self,
        item_ref: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.call(
            "toggle_org_inbox_item",
            json!({"item_ref": item_ref, "user_id": user_id}),
        )
        .await
    }

    async fn update_org_inbox_item(
        &self,
        item_ref: &str,
        new_text: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.call(
            "update_org_inbox_item",
            json!({"item_ref": item_ref, "new_text": new_text, "user_id": user_id}),
        )
        .await
    }

    async fn set_org_inbox_schedule(
        &self,
        item_ref: &str,
        schedule: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.call(
            "set_org_inbox_schedule",
            json!({"item_ref": item_ref, "schedule": schedule, "user_id": user_id}),
        )
        .await
    }

    async fn archive_org_inbox_done(&self, user_id: &str) -> Result<OrgActionResult, ToolError> {
        self.call("archive_org_inbox_done", json!({"user_id": user_id}))
            .await
    }

    async fn append_org_inbox_text(
        &self,
        text: &str,
        user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.call(
            "append_org_inbox_text",
            json!({"text": text, "user_id": user_id}),
        )
        .await
    }
}
