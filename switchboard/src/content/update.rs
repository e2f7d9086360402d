//! Update-vs-append: where new content lands inside an existing document.
//!
//! An exactly-matching section is always replaced. A fuzzily-matched section
//! is replaced when any of the §overlap/size/verb/name-drift criteria hold.
//! With no matching section, content is appended under a timestamp header.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,3})\s+(.+)$").expect("static regex"));

/// Model-number-ish and proper-noun-ish tokens ("ESP32", "Arduino Uno").
static COMPONENT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z]*\d[A-Za-z0-9-]*\b|\b[A-Z][a-z]+ [A-Z][a-z0-9]+\b")
        .expect("static regex")
});

const UPDATE_VERBS: &[&str] = &[
    "update",
    "replace",
    "revise",
    "modify",
    "improve",
    "expand",
    "enhance",
    "changed",
    "switching",
    "instead of",
];

const PLACEHOLDER_MARKERS: &[&str] = &["content will be added", "todo:"];
const PLACEHOLDER_MIN_CHARS: usize = 30;
const OVERLAP_REPLACE_THRESHOLD: f64 = 0.15;
const SMALL_SECTION_CHARS: usize = 200;
const LENGTH_RATIO_REPLACE: f64 = 1.2;
const NAME_DRIFT_THRESHOLD: f64 = 0.5;

/// A located section of a markdown document.
#[derive(Debug, Clone)]
pub struct SectionMatch {
    /// Byte range of the section body (after the header line, before the
    /// next header of equal or shallower level).
    pub body_start: usize,
    pub body_end: usize,
    pub header_text: String,
    /// Located by token overlap rather than exact title equality.
    pub fuzzy: bool,
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(String::from)
        .collect()
}

/// Finds a section by exact header match first, then by ≥50% token overlap
/// with any header.
pub fn find_section(document: &str, section: &str) -> Option<SectionMatch> {
    let headers: Vec<(usize, usize, usize, String)> = HEADER_RE
        .captures_iter(document)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let level = caps.get(1)?.as_str().len();
            let text = caps.get(2)?.as_str().trim().to_string();
            Some((whole.start(), whole.end(), level, text))
        })
        .collect();

    let body_range = |idx: usize| {
        let (_, header_end, level, _) = headers[idx];
        let end = headers[idx + 1..]
            .iter()
            .find(|(_, _, l, _)| *l <= level)
            .map(|(s, _, _, _)| *s)
            .unwrap_or(document.len());
        (header_end, end)
    };

    let wanted = section.trim().to_lowercase();
    if let Some(idx) = headers
        .iter()
        .position(|(_, _, _, text)| text.to_lowercase() == wanted)
    {
        let (body_start, body_end) = body_range(idx);
        return Some(SectionMatch {
            body_start,
            body_end,
            header_text: headers[idx].3.clone(),
            fuzzy: false,
        });
    }

    let wanted_tokens = tokens(section);
    if wanted_tokens.is_empty() {
        return None;
    }
    for (idx, (_, _, _, text)) in headers.iter().enumerate() {
        let header_tokens = tokens(text);
        let overlap = wanted_tokens.intersection(&header_tokens).count();
        if overlap * 2 >= wanted_tokens.len() {
            let (body_start, body_end) = body_range(idx);
            return Some(SectionMatch {
                body_start,
                body_end,
                header_text: text.clone(),
                fuzzy: true,
            });
        }
    }
    None
}

fn non_markup_chars(text: &str) -> usize {
    let stripped = text
        .replace("<!--", "")
        .replace("-->", "");
    stripped
        .chars()
        .filter(|c| c.is_alphanumeric())
        .count()
}

/// True for stub sections awaiting real content.
pub fn is_placeholder(section_body: &str) -> bool {
    let lower = section_body.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    non_markup_chars(section_body) < PLACEHOLDER_MIN_CHARS
}

fn token_overlap(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn component_name_drift(existing: &str, new_content: &str) -> f64 {
    let names_a: BTreeSet<String> = COMPONENT_NAME_RE
        .find_iter(existing)
        .map(|m| m.as_str().to_string())
        .collect();
    let names_b: BTreeSet<String> = COMPONENT_NAME_RE
        .find_iter(new_content)
        .map(|m| m.as_str().to_string())
        .collect();
    let union = names_a.union(&names_b).count();
    if union == 0 {
        return 0.0;
    }
    let sym_diff = names_a.symmetric_difference(&names_b).count();
    sym_diff as f64 / union as f64
}

/// Whether a fuzzily-located section should be replaced by the new content.
pub fn should_replace(existing_body: &str, new_content: &str, exact: bool, fuzzy: bool) -> bool {
    if exact {
        return true;
    }
    if is_placeholder(existing_body) {
        return true;
    }
    let new_lower = new_content.to_lowercase();
    token_overlap(existing_body, new_content) > OVERLAP_REPLACE_THRESHOLD
        || existing_body.trim().len() < SMALL_SECTION_CHARS
        || new_content.len() as f64 > LENGTH_RATIO_REPLACE * existing_body.trim().len() as f64
        || UPDATE_VERBS.iter().any(|v| new_lower.contains(v))
        || fuzzy
        || component_name_drift(existing_body, new_content) > NAME_DRIFT_THRESHOLD
}

/// Outcome of placing content into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// An existing section's body was replaced.
    Replaced,
    /// A new timestamped section was appended.
    Appended,
}

/// Places `new_content` under `section` in `document`: replaces the matching
/// section's body, or appends a new timestamped section.
pub fn apply_section_content(
    document: &str,
    section: &str,
    new_content: &str,
) -> (String, Placement) {
    if let Some(found) = find_section(document, section) {
        let existing_body = &document[found.body_start..found.body_end];
        let replace = should_replace(existing_body, new_content, !found.fuzzy, found.fuzzy);
        if replace {
            let mut updated = String::with_capacity(document.len() + new_content.len());
            updated.push_str(&document[..found.body_start]);
            updated.push_str("\n\n");
            updated.push_str(new_content.trim_end());
            updated.push('\n');
            if found.body_end < document.len() {
                updated.push('\n');
                updated.push_str(&document[found.body_end..]);
            }
            return (updated, Placement::Replaced);
        }
    }
    let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M");
    let mut updated = document.trim_end().to_string();
    updated.push_str(&format!(
        "\n\n## {} ({})\n\n{}\n",
        section,
        stamp,
        new_content.trim_end()
    ));
    (updated, Placement::Appended)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntype: project\nfiles: ['./components.md']\n---\n# Plan\n\n## Current State\n\n<!-- Content will be added here -->\n\n## Recommendations and Plans\n\nEarlier we chose the Arduino Uno platform because the relay shield matched it and the team had spare boards on hand from a prior build, which kept the first prototype cheap and quick to assemble for everyone involved in the bring-up phase.\n";

    /// **Scenario**: exact header match finds the section body; unknown
    /// headers fall through to fuzzy token overlap.
    #[test]
    fn find_exact_and_fuzzy() {
        let exact = find_section(DOC, "Current State").unwrap();
        assert!(!exact.fuzzy);
        assert!(DOC[exact.body_start..exact.body_end].contains("Content will be added"));

        let fuzzy = find_section(DOC, "Recommendations").unwrap();
        assert!(fuzzy.fuzzy);
        assert_eq!(fuzzy.header_text, "Recommendations and Plans");

        assert!(find_section(DOC, "Bill of Materials").is_none());
    }

    /// **Scenario**: placeholder bodies (stub comment, TODO, or under 30
    /// real characters) are replaced, not appended to.
    #[test]
    fn placeholders_detected() {
        assert!(is_placeholder("<!-- Content will be added here -->"));
        assert!(is_placeholder("TODO: fill in"));
        assert!(is_placeholder("\n- \n"));
        assert!(!is_placeholder(
            "A real section with a full description of the current hardware setup and firmware."
        ));
    }

    /// **Scenario**: replacing the placeholder section keeps everything else
    /// intact, including the frontmatter block.
    #[test]
    fn placeholder_section_replaced() {
        let (updated, placement) = apply_section_content(
            DOC,
            "Current State",
            "Currently using an Arduino Uno for the controller.",
        );
        assert_eq!(placement, Placement::Replaced);
        assert!(!updated.contains("Content will be added"));
        assert!(updated.contains("Currently using an Arduino Uno"));
        assert!(updated.starts_with("---\ntype: project"));
        assert!(updated.contains("## Recommendations and Plans"));
    }

    /// **Scenario**: new content with an update verb replaces a fuzzy-matched
    /// section.
    #[test]
    fn update_verbs_force_replace() {
        let (updated, placement) = apply_section_content(
            DOC,
            "Recommendations",
            "Switching to an ESP32 is recommended for the wireless requirement.",
        );
        assert_eq!(placement, Placement::Replaced);
        assert!(updated.contains("ESP32"));
        assert!(!updated.contains("spare boards on hand"));
    }

    /// **Scenario**: no matching section appends under a timestamped header.
    #[test]
    fn missing_section_appends() {
        let (updated, placement) =
            apply_section_content(DOC, "Bill of Materials", "One ESP32 module.");
        assert_eq!(placement, Placement::Appended);
        assert!(updated.contains("## Bill of Materials ("));
        assert!(updated.ends_with("One ESP32 module.\n"));
    }

    /// **Scenario**: substantial unrelated content does not replace a large
    /// settled section when no criterion fires.
    #[test]
    fn unrelated_content_appends_not_replaces() {
        let settled = "# Notes\n\n## History\n\nThe project began as a weekend experiment in greenhouse automation, with a long narrative of decisions, vendor conversations, and seasonal adjustments that filled several pages of careful notes over two years of operation and many cycles of planting schedules refined through trial and error across seasons.\n";
        let (_, placement) = apply_section_content(
            settled,
            "Weather Log",
            "Rain was heavy in March.",
        );
        assert_eq!(placement, Placement::Appended);
    }

    /// **Scenario**: component-name drift across >50% of names counts as a
    /// replace signal.
    #[test]
    fn component_name_drift_measured() {
        let drift = component_name_drift(
            "Uses the Arduino Uno and the L298N driver.",
            "Uses the ESP32 and the DRV8833 driver.",
        );
        assert!(drift > 0.5);
        let same = component_name_drift("ESP32 board", "ESP32 board rev2");
        assert!(same <= 1.0);
    }
}
