//! Dynamic tool-needs analysis: categorize the query into core and
//! conditional tool sets before the graph runs.
//!
//! The research graph currently always runs local and web in parallel at
//! round 1; the analyzer's output is stored in shared memory and surfaced in
//! final telemetry.

use crate::state::ToolAnalysis;

const WEB_MARKERS: &[&str] = &[
    "latest",
    "current",
    "recent",
    "news",
    "today",
    "this week",
    "this year",
    "price",
    "release",
    "update",
    "website",
    "online",
];

const ENTITY_MARKERS: &[&str] = &["who is", "who was", "relationship between", "company", "person"];

/// Categorizes tool needs for a research query.
pub fn analyze_tool_needs(query: &str, previous_tools_used: &[String]) -> ToolAnalysis {
    let lower = query.to_lowercase();
    let core_tools = vec![
        "search_conversation_cache".to_string(),
        "expand_query".to_string(),
        "search_documents".to_string(),
    ];
    let mut conditional_tools = Vec::new();
    let mut categories = vec!["local_search".to_string(), "cache".to_string()];
    let mut reasons = Vec::new();

    if WEB_MARKERS.iter().any(|m| lower.contains(m)) {
        conditional_tools.push("search_and_crawl".to_string());
        categories.push("web_search".to_string());
        reasons.push("query references current or external information");
    } else {
        // Web still runs in parallel at round 1; list it as conditional so
        // telemetry shows what the analyzer would load on demand.
        conditional_tools.push("search_and_crawl".to_string());
        reasons.push("web search held as a conditional supplement");
    }
    if ENTITY_MARKERS.iter().any(|m| lower.contains(m)) {
        categories.push("entities".to_string());
        reasons.push("query names specific entities");
    }
    if previous_tools_used.contains(&"search_and_crawl".to_string()) {
        reasons.push("web tooling already warm from a prior turn");
    }

    ToolAnalysis {
        core_tools,
        conditional_tools,
        categories,
        reasoning: reasons.join("; "),
    }
}
