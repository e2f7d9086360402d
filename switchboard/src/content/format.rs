//! Reference-documentation formatting: strip the conversational voice out of
//! agent prose before it lands in a project file.

use once_cell::sync::Lazy;
use regex::Regex;

static OPINION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:I|you|we)\s+(?:think|believe|recommend|suggest|feel|guess|assume)\s+(?:that\s+)?")
        .expect("static regex")
});

static LET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:let me|let's|let us)\s+").expect("static regex"));

static WOULD_YOU_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)would you like(?: me)?(?: to)?\s+([^?]+)\?").expect("static regex")
});

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("static regex"));
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Rewrites one line of agent prose as reference documentation.
pub fn format_as_reference(text: &str) -> String {
    // Questions offering work become statements of the recommendation.
    let text = WOULD_YOU_LIKE.replace_all(text, |caps: &regex::Captures| {
        format!("{} is recommended.", capitalize_first(caps[1].trim()))
    });
    let text = OPINION_PREFIX.replace_all(&text, "");
    let text = LET_PREFIX.replace_all(&text, "");
    let text = MULTI_SPACE.replace_all(&text, " ");
    let text = MULTI_NEWLINE.replace_all(&text, "\n\n");
    capitalize_first(text.trim())
}

/// Formats a bucket of sentences into one reference block.
pub fn format_bucket(sentences: &[String]) -> String {
    sentences
        .iter()
        .map(|s| format_as_reference(s))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
