//! Bucket extraction: split an agent's free-form response into routable
//! content categories.

use serde::{Deserialize, Serialize};

/// Structured fields an agent may return alongside its prose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredReturn {
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub code: Vec<String>,
    #[serde(default)]
    pub calculations: Vec<String>,
}

/// The six routable buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentBuckets {
    pub current_state: Vec<String>,
    pub new_plans: Vec<String>,
    pub components: Vec<String>,
    pub code: Vec<String>,
    pub calculations: Vec<String>,
    pub general: Vec<String>,
}

const CURRENT_STATE_MARKERS: &[&str] = &[
    "currently",
    "now",
    "existing",
    "already",
    "have",
    "has",
    "is using",
    "current setup",
    "current system",
    "present",
    "at present",
    "right now",
];

const NEW_PLANS_MARKERS: &[&str] = &[
    "should",
    "recommend",
    "suggest",
    "plan",
    "propose",
    "consider",
    "next step",
    "would be",
    "could",
    "might want",
    "option",
    "alternative",
    "better",
    "improve",
    "upgrade",
    "replace",
];

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .flat_map(|chunk| chunk.split('\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Classifies each sentence of the response into a bucket; structured fields
/// land in their own buckets directly.
pub fn extract_buckets(response: &str, structured: &StructuredReturn) -> ContentBuckets {
    let mut buckets = ContentBuckets {
        components: structured.components.clone(),
        code: structured.code.clone(),
        calculations: structured.calculations.clone(),
        ..Default::default()
    };

    for sentence in split_sentences(response) {
        let lower = sentence.to_lowercase();
        if CURRENT_STATE_MARKERS.iter().any(|m| lower.contains(m)) {
            buckets.current_state.push(sentence);
        } else if NEW_PLANS_MARKERS.iter().any(|m| lower.contains(m)) {
            buckets.new_plans.push(sentence);
        } else {
            buckets.general.push(sentence);
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: present-tense setup sentences land in current_state;
    /// recommendations in new_plans; the rest in general.
    #[test]
    fn sentences_bucketed_by_markers() {
        let buckets = extract_buckets(
            "Currently using an Arduino Uno for the controller. \
             I recommend switching to an ESP32. \
             The enclosure is painted blue.",
            &StructuredReturn::default(),
        );
        assert_eq!(buckets.current_state.len(), 1);
        assert!(buckets.current_state[0].contains("Arduino Uno"));
        assert_eq!(buckets.new_plans.len(), 1);
        assert!(buckets.new_plans[0].contains("ESP32"));
        assert_eq!(buckets.general.len(), 1);
    }

    /// **Scenario**: current_state wins over new_plans when both match
    /// ("currently ... should" is a statement about the present).
    #[test]
    fn current_state_takes_precedence() {
        let buckets = extract_buckets(
            "The system currently runs code we should revisit.",
            &StructuredReturn::default(),
        );
        assert_eq!(buckets.current_state.len(), 1);
        assert!(buckets.new_plans.is_empty());
    }

    /// **Scenario**: structured fields pass straight through to their
    /// buckets.
    #[test]
    fn structured_fields_pass_through() {
        let structured = StructuredReturn {
            components: vec!["ESP32-WROOM-32 module".into()],
            code: vec!["fn main() {}".into()],
            calculations: vec!["5V * 2A = 10W".into()],
        };
        let buckets = extract_buckets("", &structured);
        assert_eq!(buckets.components, structured.components);
        assert_eq!(buckets.code, structured.code);
        assert_eq!(buckets.calculations, structured.calculations);
    }
}
