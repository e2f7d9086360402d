//! Active-editor extraction from the incoming request.
//!
//! Scalar fields copy verbatim. Frontmatter custom fields arrive as strings;
//! values that are really lists of referenced files (`files`, `components`,
//! `protocols`, `schematics`, `specifications`, ...) must be recovered:
//! a `[...]` string is tried as a Python-literal list, then a JSON list; a
//! multi-line string whose first trimmed line starts with `-` is tried as a
//! YAML list; anything else is stored as-is.

use chunk_stream::ActiveEditorPayload;

use crate::state::{ActiveEditor, CustomValue, EditorFrontmatter};

/// Parses a Python-literal list of strings: `['./a.md', "b.md"]`.
///
/// Walks the bracketed body splitting on top-level commas, honoring single
/// and double quotes with backslash escapes. Returns `None` on anything that
/// does not look like a flat list of scalars.
fn parse_python_list(value: &str) -> Option<Vec<String>> {
    let inner = value.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => current.push(c),
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, ',') => {
                let item = current.trim().to_string();
                if !item.is_empty() {
                    items.push(item);
                }
                current.clear();
            }
            (None, '[') | (None, ']') => return None,
            (None, _) => current.push(c),
        }
    }
    if quote.is_some() {
        return None;
    }
    let last = current.trim().to_string();
    if !last.is_empty() {
        items.push(last);
    }
    Some(items)
}

/// Recovers one custom-field value per the precedence above.
pub fn parse_custom_field(value: &str) -> CustomValue {
    let trimmed = value.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Some(items) = parse_python_list(trimmed) {
            return CustomValue::List(items);
        }
        if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
            return CustomValue::List(items);
        }
    } else if trimmed.contains('\n') {
        let first_line = trimmed.lines().next().unwrap_or("").trim();
        if first_line.starts_with('-') {
            if let Ok(items) = serde_yaml::from_str::<Vec<String>>(trimmed) {
                return CustomValue::List(items);
            }
        }
    }
    CustomValue::Text(value.to_string())
}

/// Builds the structured editor record from the request payload.
pub fn extract_active_editor(payload: &ActiveEditorPayload) -> ActiveEditor {
    let mut frontmatter = EditorFrontmatter {
        doc_type: payload.frontmatter.doc_type.clone(),
        title: payload.frontmatter.title.clone(),
        author: payload.frontmatter.author.clone(),
        tags: payload.frontmatter.tags.clone(),
        status: payload.frontmatter.status.clone(),
        ..Default::default()
    };
    for (key, value) in &payload.frontmatter.custom_fields {
        frontmatter
            .custom_fields
            .insert(key.clone(), parse_custom_field(value));
    }
    ActiveEditor {
        is_editable: payload.is_editable,
        filename: payload.filename.clone(),
        canonical_path: payload.canonical_path.clone(),
        language: payload.language.clone(),
        content: payload.content.clone(),
        frontmatter,
        cursor_offset: None,
    }
}
