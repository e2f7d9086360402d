//! Org-mode link parsing and context-aware filtering.
//!
//! Filtering narrows the links in the editor to the ones the user is
//! plausibly talking about: first the heading subtree under the cursor,
//! else subtrees whose heading shares a token with a project-name phrase
//! from the query, else everything.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state::ActiveEditor;

/// `[[file:path][desc]]` or `[[file:path::*Heading][desc]]`; description
/// optional.
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[file:([^\]\[]+)\](?:\[([^\]]*)\])?\]").expect("static regex"));

/// Org heading line: stars, space, title.
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\*+)\s+(.+)$").expect("static regex"));

static PROJECT_PHRASE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)for my ([a-z0-9][a-z0-9 \-]*?) project").expect("static regex"),
        Regex::new(r"(?i)the ([a-z0-9][a-z0-9 \-]*?) (?:plan|project)").expect("static regex"),
    ]
});

/// One org file link surviving the context filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgLink {
    pub file_path: String,
    /// Heading target after `::`, with a leading `*` stripped.
    pub heading: Option<String>,
    pub description: String,
    /// Why this link survived: `cursor_subtree`, `query_project_match`, or
    /// `all_links`.
    pub context_reason: String,
    /// Byte offset of the link within the editor content.
    pub offset: usize,
}

/// Extracts every `[[file:...]]` link with its byte offset.
pub fn parse_org_links(content: &str) -> Vec<OrgLink> {
    LINK_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let target = caps.get(1)?.as_str();
            let (file_path, heading) = match target.split_once("::") {
                Some((path, heading)) => (
                    path.to_string(),
                    Some(heading.trim_start_matches('*').to_string()),
                ),
                None => (target.to_string(), None),
            };
            Some(OrgLink {
                file_path,
                heading,
                description: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                context_reason: String::new(),
                offset: whole.start(),
            })
        })
        .collect()
}

struct Subtree {
    start: usize,
    end: usize,
    title: String,
}

/// Heading subtrees of the document: each runs from its heading line to the
/// next heading of equal or shallower level.
fn subtrees(content: &str) -> Vec<Subtree> {
    let headings: Vec<(usize, usize, String)> = HEADING_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let stars = caps.get(1)?.as_str().len();
            let title = caps.get(2)?.as_str().to_string();
            Some((whole.start(), stars, title))
        })
        .collect();
    headings
        .iter()
        .enumerate()
        .map(|(i, (start, level, title))| {
            let end = headings[i + 1..]
                .iter()
                .find(|(_, l, _)| l <= level)
                .map(|(s, _, _)| *s)
                .unwrap_or(content.len());
            Subtree {
                start: *start,
                end,
                title: title.clone(),
            }
        })
        .collect()
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(String::from)
        .collect()
}

/// Project-name phrases pulled from the query (`for my <X> project`,
/// `the <X> plan`).
pub fn extract_project_phrases(query: &str) -> Vec<String> {
    let mut phrases = Vec::new();
    for re in PROJECT_PHRASE_RES.iter() {
        for caps in re.captures_iter(query) {
            if let Some(m) = caps.get(1) {
                phrases.push(m.as_str().trim().to_string());
            }
        }
    }
    phrases
}

/// Filters the editor's links by context. Returns an empty list when the
/// editor is missing or has no links.
pub fn filter_links(editor: Option<&ActiveEditor>, query: &str) -> Vec<OrgLink> {
    let Some(editor) = editor else {
        return Vec::new();
    };
    let mut links = parse_org_links(&editor.content);
    if links.is_empty() {
        return links;
    }
    let trees = subtrees(&editor.content);

    // 1. Subtree under the cursor.
    if let Some(cursor) = editor.cursor_offset {
        // The innermost subtree containing the cursor wins.
        let containing = trees
            .iter()
            .filter(|t| t.start <= cursor && cursor < t.end)
            .min_by_key(|t| t.end - t.start);
        if let Some(tree) = containing {
            let kept: Vec<OrgLink> = links
                .iter()
                .filter(|l| tree.start <= l.offset && l.offset < tree.end)
                .cloned()
                .map(|mut l| {
                    l.context_reason = "cursor_subtree".into();
                    l
                })
                .collect();
            if !kept.is_empty() {
                return kept;
            }
        }
    }

    // 2. Subtrees matching a project-name phrase from the query.
    let phrases = extract_project_phrases(query);
    if !phrases.is_empty() {
        let phrase_tokens: Vec<Vec<String>> = phrases.iter().map(|p| tokens(p)).collect();
        let kept: Vec<OrgLink> = links
            .iter()
            .filter(|l| {
                trees.iter().any(|t| {
                    if !(t.start <= l.offset && l.offset < t.end) {
                        return false;
                    }
                    let heading_tokens = tokens(&t.title);
                    phrase_tokens
                        .iter()
                        .any(|pt| pt.iter().any(|tok| heading_tokens.contains(tok)))
                })
            })
            .cloned()
            .map(|mut l| {
                l.context_reason = "query_project_match".into();
                l
            })
            .collect();
        if !kept.is_empty() {
            return kept;
        }
    }

    // 3. Everything.
    for link in &mut links {
        link.context_reason = "all_links".into();
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG_DOC: &str = "\
* Greenhouse Build
Some intro text.
[[file:./greenhouse-frame.org][Frame notes]]
** Materials
[[file:./materials.org::*Lumber][Lumber list]]
* Aquaponics Plan
[[file:./aquaponics.org][Fish and plants]]
";

    fn editor_with(content: &str, cursor: Option<usize>) -> ActiveEditor {
        ActiveEditor {
            content: content.to_string(),
            cursor_offset: cursor,
            ..Default::default()
        }
    }

    /// **Scenario**: link parsing captures paths, optional headings after
    /// `::`, and descriptions.
    #[test]
    fn parse_links_with_headings() {
        let links = parse_org_links(ORG_DOC);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].file_path, "./greenhouse-frame.org");
        assert_eq!(links[0].description, "Frame notes");
        assert_eq!(links[1].heading.as_deref(), Some("Lumber"));
        assert_eq!(links[2].file_path, "./aquaponics.org");
    }

    /// **Scenario**: the cursor inside a subtree keeps only that subtree's
    /// links, tagged `cursor_subtree`.
    #[test]
    fn cursor_subtree_filters() {
        let cursor = ORG_DOC.find("Aquaponics").unwrap();
        let editor = editor_with(ORG_DOC, Some(cursor));
        let kept = filter_links(Some(&editor), "analyze this");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].file_path, "./aquaponics.org");
        assert_eq!(kept[0].context_reason, "cursor_subtree");
    }

    /// **Scenario**: without a cursor, a project-name phrase in the query
    /// selects subtrees whose heading shares a token.
    #[test]
    fn query_phrase_filters() {
        let editor = editor_with(ORG_DOC, None);
        let kept = filter_links(
            Some(&editor),
            "compare the linked files for my greenhouse project",
        );
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|l| l.context_reason == "query_project_match"));
        assert!(kept.iter().any(|l| l.file_path == "./materials.org"));
    }

    /// **Scenario**: no cursor and no phrase keeps every link; a missing
    /// editor yields an empty list.
    #[test]
    fn fallback_keeps_all() {
        let editor = editor_with(ORG_DOC, None);
        let kept = filter_links(Some(&editor), "synthesize these notes");
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|l| l.context_reason == "all_links"));

        assert!(filter_links(None, "anything").is_empty());
    }
}
