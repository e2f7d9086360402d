//! Recording tool-service double for tests.
//!
//! Returns configurable canned results, records every operation name in
//! invocation order, and can be told to fail specific operations. Keeps an
//! in-memory document store so content updates behave like the real service
//! (including an optional frontmatter-dropping append to exercise FM-1).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::*;
use super::{ToolError, ToolService};

#[derive(Default)]
pub struct RecordingTools {
    calls: Mutex<Vec<String>>,
    fail_ops: Mutex<HashSet<String>>,

    cache: Mutex<CacheLookup>,
    expansion: Mutex<Option<QueryExpansion>>,
    documents: Mutex<SearchDocumentsResult>,
    web: Mutex<WebResearch>,
    weather: Mutex<WeatherReport>,
    images: Mutex<GeneratedImages>,

    doc_contents: Mutex<HashMap<String, String>>,
    path_resolutions: Mutex<HashMap<String, PathResolution>>,
    /// When set, appends silently drop the document's frontmatter block,
    /// simulating the racy write FM-1 protects against.
    drop_frontmatter_on_append: Mutex<bool>,

    content_updates: Mutex<Vec<(String, String, bool)>>,
    proposals: Mutex<Vec<EditProposalRequest>>,
    direct_ops: Mutex<Vec<(String, usize)>>,
    org_appends: Mutex<Vec<String>>,
    org_items: Mutex<Vec<OrgInboxNewItem>>,
}

impl RecordingTools {
    fn record(&self, op: &str) -> Result<(), ToolError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op.to_string());
        }
        let failing = self
            .fail_ops
            .lock()
            .map(|f| f.contains(op))
            .unwrap_or(false);
        if failing {
            return Err(ToolError::Service {
                code: "UNAVAILABLE".into(),
                details: format!("{} configured to fail", op),
            });
        }
        Ok(())
    }

    /// Operation names seen so far, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn fail_op(&self, op: &str) {
        if let Ok(mut f) = self.fail_ops.lock() {
            f.insert(op.to_string());
        }
    }

    pub fn set_cache(&self, lookup: CacheLookup) {
        if let Ok(mut c) = self.cache.lock() {
            *c = lookup;
        }
    }

    pub fn set_expansion(&self, expansion: QueryExpansion) {
        if let Ok(mut e) = self.expansion.lock() {
            *e = Some(expansion);
        }
    }

    pub fn set_documents(&self, result: SearchDocumentsResult) {
        if let Ok(mut d) = self.documents.lock() {
            *d = result;
        }
    }

    pub fn set_web(&self, research: WebResearch) {
        if let Ok(mut w) = self.web.lock() {
            *w = research;
        }
    }

    pub fn set_doc_content(&self, document_id: &str, content: &str) {
        if let Ok(mut d) = self.doc_contents.lock() {
            d.insert(document_id.to_string(), content.to_string());
        }
    }

    pub fn doc_content(&self, document_id: &str) -> Option<String> {
        self.doc_contents
            .lock()
            .ok()
            .and_then(|d| d.get(document_id).cloned())
    }

    pub fn set_path_resolution(&self, file_path: &str, resolution: PathResolution) {
        if let Ok(mut p) = self.path_resolutions.lock() {
            p.insert(file_path.to_string(), resolution);
        }
    }

    pub fn set_drop_frontmatter_on_append(&self, drop: bool) {
        if let Ok(mut d) = self.drop_frontmatter_on_append.lock() {
            *d = drop;
        }
    }

    pub fn content_updates(&self) -> Vec<(String, String, bool)> {
        self.content_updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    pub fn proposals(&self) -> Vec<EditProposalRequest> {
        self.proposals.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn org_appends(&self) -> Vec<String> {
        self.org_appends
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn org_items(&self) -> Vec<OrgInboxNewItem> {
        self.org_items.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolService for RecordingTools {
    async fn search_documents(
        &self,
        _query: &str,
        _user_id: &str,
        _limit: u32,
    ) -> Result<SearchDocumentsResult, ToolError> {
        self.record("search_documents")?;
        Ok(self.documents.lock().map(|d| d.clone()).unwrap_or_default())
    }

    async fn get_document(
        &self,
        document_id: &str,
        _user_id: &str,
    ) -> Result<Option<DocumentInfo>, ToolError> {
        self.record("get_document")?;
        let exists = self
            .doc_contents
            .lock()
            .map(|d| d.contains_key(document_id))
            .unwrap_or(false);
        Ok(exists.then(|| DocumentInfo {
            document_id: document_id.to_string(),
            ..Default::default()
        }))
    }

    async fn get_document_content(
        &self,
        document_id: &str,
        _user_id: &str,
    ) -> Result<Option<String>, ToolError> {
        self.record("get_document_content")?;
        Ok(self
            .doc_contents
            .lock()
            .ok()
            .and_then(|d| d.get(document_id).cloned()))
    }

    async fn find_document_by_path(
        &self,
        file_path: &str,
        _user_id: &str,
        _base_path: Option<&str>,
    ) -> Result<Option<PathResolution>, ToolError> {
        self.record("find_document_by_path")?;
        Ok(self
            .path_resolutions
            .lock()
            .ok()
            .and_then(|p| p.get(file_path).cloned()))
    }

    async fn create_user_file(
        &self,
        request: CreateFileRequest,
    ) -> Result<CreateFileResult, ToolError> {
        self.record("create_user_file")?;
        if let Ok(mut d) = self.doc_contents.lock() {
            d.insert(format!("doc:{}", request.filename), request.content.clone());
        }
        Ok(CreateFileResult {
            success: true,
            document_id: format!("doc:{}", request.filename),
            filename: request.filename,
            ..Default::default()
        })
    }

    async fn update_document_metadata(
        &self,
        _document_id: &str,
        _user_id: &str,
        _title: Option<&str>,
        _frontmatter_type: Option<&str>,
    ) -> Result<MetadataUpdateResult, ToolError> {
        self.record("update_document_metadata")?;
        Ok(MetadataUpdateResult {
            success: true,
            updated_fields: vec![],
        })
    }

    async fn update_document_content(
        &self,
        document_id: &str,
        content: &str,
        _user_id: &str,
        append: bool,
    ) -> Result<UpdateResult, ToolError> {
        self.record("update_document_content")?;
        if let Ok(mut updates) = self.content_updates.lock() {
            updates.push((document_id.to_string(), content.to_string(), append));
        }
        let drop_fm = self
            .drop_frontmatter_on_append
            .lock()
            .map(|d| *d)
            .unwrap_or(false);
        if let Ok(mut docs) = self.doc_contents.lock() {
            let entry = docs.entry(document_id.to_string()).or_default();
            if append {
                let mut base = entry.clone();
                if drop_fm {
                    base = crate::frontmatter::split(&base)
                        .map(|(_, body)| body)
                        .unwrap_or(base);
                }
                *entry = format!("{}\n{}", base.trim_end(), content);
            } else {
                *entry = content.to_string();
            }
        }
        Ok(UpdateResult {
            success: true,
            content_length: content.len() as u64,
        })
    }

    async fn propose_document_edit(
        &self,
        proposal: EditProposalRequest,
    ) -> Result<ProposalResult, ToolError> {
        self.record("propose_document_edit")?;
        if let Ok(mut p) = self.proposals.lock() {
            p.push(proposal);
        }
        Ok(ProposalResult {
            success: true,
            proposal_id: "proposal-1".into(),
        })
    }

    async fn apply_operations_directly(
        &self,
        document_id: &str,
        operations: &[EditorOperation],
        _user_id: &str,
        _agent_name: &str,
    ) -> Result<ApplyDirectResult, ToolError> {
        self.record("apply_operations_directly")?;
        if let Ok(mut ops) = self.direct_ops.lock() {
            ops.push((document_id.to_string(), operations.len()));
        }
        Ok(ApplyDirectResult {
            success: true,
            applied_count: operations.len() as u32,
        })
    }

    async fn search_web(
        &self,
        _query: &str,
        _max_results: u32,
        _user_id: &str,
    ) -> Result<Vec<WebHit>, ToolError> {
        self.record("search_web")?;
        Ok(Vec::new())
    }

    async fn crawl_web_content(
        &self,
        _urls: &[String],
        _user_id: &str,
    ) -> Result<Vec<CrawledPage>, ToolError> {
        self.record("crawl_web_content")?;
        Ok(Vec::new())
    }

    async fn search_and_crawl(
        &self,
        _query: &str,
        _max_results: u32,
        _user_id: &str,
    ) -> Result<WebResearch, ToolError> {
        self.record("search_and_crawl")?;
        Ok(self.web.lock().map(|w| w.clone()).unwrap_or_default())
    }

    async fn expand_query(
        &self,
        query: &str,
        _num_variations: u32,
        _user_id: &str,
        _conversation_context: Option<&str>,
    ) -> Result<QueryExpansion, ToolError> {
        self.record("expand_query")?;
        Ok(self
            .expansion
            .lock()
            .ok()
            .and_then(|e| e.clone())
            .unwrap_or(QueryExpansion {
                original_query: query.to_string(),
                expanded_queries: vec![query.to_string()],
                key_entities: vec![],
                expansion_count: 1,
            }))
    }

    async fn search_conversation_cache(
        &self,
        _query: &str,
        _conversation_id: Option<&str>,
        _freshness_hours: u32,
        _user_id: &str,
    ) -> Result<CacheLookup, ToolError> {
        self.record("search_conversation_cache")?;
        Ok(self.cache.lock().map(|c| c.clone()).unwrap_or_default())
    }

    async fn update_conversation_title(
        &self,
        _conversation_id: &str,
        title: &str,
        _user_id: &str,
    ) -> Result<TitleUpdate, ToolError> {
        self.record("update_conversation_title")?;
        Ok(TitleUpdate {
            success: true,
            title: title.to_string(),
        })
    }

    async fn get_weather(
        &self,
        location: &str,
        _user_id: &str,
        _data_types: &[String],
        _date_str: Option<&str>,
    ) -> Result<WeatherReport, ToolError> {
        self.record("get_weather")?;
        let mut report = self.weather.lock().map(|w| w.clone()).unwrap_or_default();
        if report.location.is_empty() {
            report.location = location.to_string();
        }
        Ok(report)
    }

    async fn generate_image(&self, _request: ImageRequest) -> Result<GeneratedImages, ToolError> {
        self.record("generate_image")?;
        Ok(self.images.lock().map(|i| i.clone()).unwrap_or_default())
    }

    async fn create_chart(&self, request: ChartRequest) -> Result<ChartResult, ToolError> {
        self.record("create_chart")?;
        Ok(ChartResult {
            success: true,
            chart_type: request.chart_type,
            ..Default::default()
        })
    }

    async fn analyze_text_content(
        &self,
        _content: &str,
        _include_advanced: bool,
        _user_id: &str,
    ) -> Result<serde_json::Value, ToolError> {
        self.record("analyze_text_content")?;
        Ok(serde_json::json!({}))
    }

    async fn add_org_inbox_item(
        &self,
        item: OrgInboxNewItem,
        _user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.record("add_org_inbox_item")?;
        if let Ok(mut items) = self.org_items.lock() {
            items.push(item);
        }
        Ok(OrgActionResult {
            success: true,
            message: "added".into(),
        })
    }

    async fn list_org_inbox_items(&self, _user_id: &str) -> Result<OrgInboxList, ToolError> {
        self.record("list_org_inbox_items")?;
        Ok(OrgInboxList {
            success: true,
            items: vec![OrgInboxEntry {
                index: 1,
                text: "TODO Review PCB layout".into(),
                state: "TODO".into(),
                schedule: None,
            }],
        })
    }

    async fn toggle_org_inbox_item(
        &self,
        _item_ref: &str,
        _user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.record("toggle_org_inbox_item")?;
        Ok(OrgActionResult {
            success: true,
            message: "toggled".into(),
        })
    }

    async fn update_org_inbox_item(
        &self,
        _item_ref: &str,
        _new_text: &str,
        _user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.record("update_org_inbox_item")?;
        Ok(OrgActionResult {
            success: true,
            message: "updated".into(),
        })
    }

    async fn set_org_inbox_schedule(
        &self,
        _item_ref: &str,
        _schedule: &str,
        _user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.record("set_org_inbox_schedule")?;
        Ok(OrgActionResult {
            success: true,
            message: "scheduled".into(),
        })
    }

    async fn archive_org_inbox_done(&self, _user_id: &str) -> Result<OrgActionResult, ToolError> {
        self.record("archive_org_inbox_done")?;
        Ok(OrgActionResult {
            success: true,
            message: "archived".into(),
        })
    }

    async fn append_org_inbox_text(
        &self,
        text: &str,
        _user_id: &str,
    ) -> Result<OrgActionResult, ToolError> {
        self.record("append_org_inbox_text")?;
        if let Ok(mut appends) = self.org_appends.lock() {
            appends.push(text.to_string());
        }
        Ok(OrgActionResult {
            success: true,
            message: "appended".into(),
        })
    }
}
