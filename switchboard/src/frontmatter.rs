//! Frontmatter read-modify-write, isolated behind explicit pre/post diffs.
//!
//! Frontmatter rewriting is the single riskiest operation in the
//! project-content router: an append that races another writer can drop
//! fields from the `---` block. Every append therefore goes through
//! [`append_preserving_frontmatter`], which diffs the field sets before and
//! after and restores anything lost.

use std::collections::BTreeSet;

/// Splits a document into its YAML frontmatter block and body. The block
/// must start at the first line.
pub fn split(content: &str) -> Option<(String, String)> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    let block = rest[..end].to_string();
    let mut body = &rest[end + 4..];
    if let Some(stripped) = body.strip_prefix('\n') {
        body = stripped;
    }
    Some((block, body.to_string()))
}

/// Parses the frontmatter block into ordered `(key, raw value)` pairs.
/// Only top-level `key: value` lines count; indented continuation lines
/// belong to the previous key.
pub fn parse_fields(block: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for line in block.lines() {
        if line.starts_with(' ') || line.starts_with('\t') || line.starts_with('-') {
            if let Some(last) = fields.last_mut() {
                last.1.push('\n');
                last.1.push_str(line);
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fields.push((key.to_string(), value.trim().to_string()));
        }
    }
    fields
}

/// The set of frontmatter keys of a document (empty set when there is no
/// frontmatter block).
pub fn field_keys(content: &str) -> BTreeSet<String> {
    match split(content) {
        Some((block, _)) => parse_fields(&block).into_iter().map(|(k, _)| k).collect(),
        None => BTreeSet::new(),
    }
}

/// Rebuilds a document from frontmatter fields and a body.
pub fn assemble(fields: &[(String, String)], body: &str) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        if value.starts_with('\n') {
            out.push_str(&format!("{}:{}\n", key, value));
        } else {
            out.push_str(&format!("{}: {}\n", key, value));
        }
    }
    out.push_str("---\n");
    out.push_str(body);
    out
}

/// Given the pre-update document and the post-update document, restores any
/// frontmatter field lost by the update. Returns `Some(repaired)` when a
/// repair write is needed, `None` when the field set survived (FM-1 holds).
pub fn repair_lost_fields(pre: &str, post: &str) -> Option<String> {
    let (pre_block, _) = split(pre)?;
    let pre_fields = parse_fields(&pre_block);
    if pre_fields.is_empty() {
        return None;
    }
    let post_keys = field_keys(post);
    let lost: Vec<&(String, String)> = pre_fields
        .iter()
        .filter(|(k, _)| !post_keys.contains(k))
        .collect();
    if lost.is_empty() {
        return None;
    }
    tracing::warn!(count = lost.len(), "frontmatter fields lost by update; restoring");

    match split(post) {
        Some((post_block, body)) => {
            let mut fields = parse_fields(&post_block);
            for (k, v) in lost {
                fields.push((k.clone(), v.clone()));
            }
            Some(assemble(&fields, &body))
        }
        // The whole block vanished: put the pre-update block back on top.
        None => Some(assemble(&pre_fields, post)),
    }
}
