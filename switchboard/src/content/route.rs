//! File routing: score the project's referenced files for a block of
//! content, and gate the new-file suggestion path.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state::ActiveEditor;

use super::classify::ContentType;

const REFERENCED_FILENAME_BASE: f64 = 3.0;
const PLAIN_FILENAME_BASE: f64 = 1.0;
const REFERENCED_CONTEXT_BOOST: f64 = 2.0;
const KEYWORD_OVERLAP_WEIGHT: f64 = 0.5;
const RESPONSE_OVERLAP_WEIGHT: f64 = 0.1;

/// Tuned against real projects; not re-validated across domains.
const NEW_FILE_MIN_CHARS: usize = 1500;
const NEW_FILE_MAX_EXISTING_SCORE: f64 = 0.2;
const NEW_FILE_MIN_TOPIC_HITS: usize = 3;
const NEW_FILE_MIN_CAPITALIZED_NAMES: usize = 2;

static CAPITALIZED_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z]*\d[A-Za-z0-9-]*\b|\b[A-Z][a-z]+ [A-Z][a-z0-9]+\b")
        .expect("static regex")
});

/// One candidate target file from the project frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFile {
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Listed under the content type's frontmatter key (vs. the generic
    /// `files` list).
    #[serde(default)]
    pub referenced_context: bool,
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(String::from)
        .collect()
}

/// Collects candidate files from the editor's frontmatter lists. Files
/// listed under the content type's own key are marked referenced-context.
pub fn candidates_from_editor(editor: &ActiveEditor, content_type: ContentType) -> Vec<CandidateFile> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    let type_key = content_type.frontmatter_key();
    for (key, value) in &editor.frontmatter.custom_fields {
        let Some(list) = value.as_list() else { continue };
        let referenced = key == type_key;
        for path in list {
            if !seen.insert(path.clone()) && !referenced {
                continue;
            }
            let filename = path.rsplit('/').next().unwrap_or(path).to_string();
            let title = filename
                .trim_end_matches(".md")
                .trim_end_matches(".org")
                .replace(['-', '_'], " ");
            if referenced {
                // A referenced-context entry supersedes a generic one.
                out.retain(|c: &CandidateFile| c.filename != filename);
            } else if out.iter().any(|c: &CandidateFile| c.filename == filename) {
                continue;
            }
            out.push(CandidateFile {
                filename,
                title,
                description: String::new(),
                referenced_context: referenced,
            });
        }
    }
    out
}

fn type_keywords(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::Component => &["component", "part", "module", "hardware"],
        ContentType::Protocol => &["protocol", "interface", "communication"],
        ContentType::Schematic => &["schematic", "wiring", "circuit"],
        ContentType::Specification => &["specification", "spec", "requirements"],
        ContentType::Architecture => &["architecture", "design", "overview", "plan"],
        ContentType::Code => &["code", "firmware", "software"],
    }
}

/// Scores a candidate for a block of content.
pub fn score_candidate(
    candidate: &CandidateFile,
    content_type: ContentType,
    response: &str,
) -> f64 {
    let mut score = if candidate.referenced_context {
        REFERENCED_FILENAME_BASE + REFERENCED_CONTEXT_BOOST
    } else {
        PLAIN_FILENAME_BASE
    };
    let name_tokens = tokens(&format!("{} {}", candidate.title, candidate.description));
    for keyword in type_keywords(content_type) {
        if name_tokens.contains(*keyword) {
            score += KEYWORD_OVERLAP_WEIGHT;
        }
    }
    let response_tokens = tokens(response);
    score += response_tokens.intersection(&name_tokens).count() as f64 * RESPONSE_OVERLAP_WEIGHT;
    score
}

/// Picks the highest-scoring candidate. Architecture content never routes
/// here (it pins to the main project plan).
pub fn route_to_file(
    candidates: &[CandidateFile],
    content_type: ContentType,
    response: &str,
) -> Option<(CandidateFile, f64)> {
    candidates
        .iter()
        .map(|c| (c.clone(), score_candidate(c, content_type, response)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Suggestion payload for a brand-new project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFileSuggestion {
    pub suggested_filename: String,
    pub suggested_title: String,
    pub suggested_description: String,
    pub content_type: ContentType,
    pub file_type: String,
    pub frontmatter_key: String,
    pub section: String,
    pub suggestion_message: String,
}

fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Gates the new-file path: substantial content, strong topic indicators,
/// at least two capitalized specific names, and no existing same-type file
/// scoring above the threshold.
pub fn suggest_new_file(
    content: &str,
    content_type: ContentType,
    best_same_type_score: f64,
) -> Option<NewFileSuggestion> {
    if content.len() <= NEW_FILE_MIN_CHARS {
        return None;
    }
    if best_same_type_score > NEW_FILE_MAX_EXISTING_SCORE {
        return None;
    }
    let lower = content.to_lowercase();
    let topic_hits: usize = type_keywords(content_type)
        .iter()
        .map(|k| lower.matches(*k).count())
        .sum();
    if topic_hits < NEW_FILE_MIN_TOPIC_HITS {
        return None;
    }
    let names: BTreeSet<String> = CAPITALIZED_NAME_RE
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect();
    if names.len() < NEW_FILE_MIN_CAPITALIZED_NAMES {
        return None;
    }

    let primary_name = names.iter().next().cloned().unwrap_or_default();
    let title = format!("{} {}", primary_name, content_type.section());
    let filename = format!("{}.md", slugify(&title));
    Some(NewFileSuggestion {
        suggested_filename: filename.clone(),
        suggested_title: title.clone(),
        suggested_description: format!(
            "{} notes split out of the project plan",
            content_type.as_str()
        ),
        content_type,
        file_type: content_type.as_str().to_string(),
        frontmatter_key: content_type.frontmatter_key().to_string(),
        section: content_type.section().to_string(),
        suggestion_message: format!(
            "This {} content is substantial; consider a dedicated file `{}` referenced from the project frontmatter.",
            content_type.as_str(),
            filename
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CustomValue, EditorFrontmatter};

    fn editor_with_files() -> ActiveEditor {
        let mut frontmatter = EditorFrontmatter::default();
        frontmatter.custom_fields.insert(
            "files".into(),
            CustomValue::List(vec!["./components.md".into(), "./schematic.md".into()]),
        );
        frontmatter.custom_fields.insert(
            "components".into(),
            CustomValue::List(vec!["./components.md".into()]),
        );
        ActiveEditor {
            filename: "plan.md".into(),
            frontmatter,
            ..Default::default()
        }
    }

    /// **Scenario**: frontmatter lists become candidates; files under the
    /// type's own key are referenced-context and outscore generic entries.
    #[test]
    fn referenced_context_outscores_generic() {
        let editor = editor_with_files();
        let candidates = candidates_from_editor(&editor, ContentType::Component);
        assert_eq!(candidates.len(), 2);
        let best = route_to_file(
            &candidates,
            ContentType::Component,
            "the ESP32 component selection",
        )
        .unwrap();
        assert_eq!(best.0.filename, "components.md");
        assert!(best.0.referenced_context);
        assert!(best.1 >= REFERENCED_FILENAME_BASE + REFERENCED_CONTEXT_BOOST);
    }

    /// **Scenario**: the new-file gates reject short content, weak topics,
    /// and good existing targets; a long name-rich block passes.
    #[test]
    fn new_file_gates() {
        assert!(suggest_new_file("short", ContentType::Component, 0.0).is_none());

        let long_weak = "plain prose ".repeat(200);
        assert!(suggest_new_file(&long_weak, ContentType::Component, 0.0).is_none());

        let mut strong = String::new();
        for i in 0..60 {
            strong.push_str(&format!(
                "The ESP32 module and the DRV8833 component share a hardware bus, part {}.\n",
                i
            ));
        }
        assert!(strong.len() > NEW_FILE_MIN_CHARS);
        let suggestion = suggest_new_file(&strong, ContentType::Component, 0.1).unwrap();
        assert_eq!(suggestion.frontmatter_key, "components");
        assert!(suggestion.suggested_filename.ends_with(".md"));

        // A same-type file already scoring above threshold suppresses it.
        assert!(suggest_new_file(&strong, ContentType::Component, 0.3).is_none());
    }
}
