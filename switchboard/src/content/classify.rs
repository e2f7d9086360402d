//! Content-type classification by keyword score.

use serde::{Deserialize, Serialize};

/// What kind of project content a block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Component,
    Protocol,
    Schematic,
    Specification,
    Architecture,
    Code,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Component => "component",
            ContentType::Protocol => "protocol",
            ContentType::Schematic => "schematic",
            ContentType::Specification => "specification",
            ContentType::Architecture => "architecture",
            ContentType::Code => "code",
        }
    }

    /// Frontmatter key listing files of this type.
    pub fn frontmatter_key(&self) -> &'static str {
        match self {
            ContentType::Component => "components",
            ContentType::Protocol => "protocols",
            ContentType::Schematic => "schematics",
            ContentType::Specification => "specifications",
            ContentType::Architecture => "files",
            ContentType::Code => "files",
        }
    }

    /// Section header this content lands under.
    pub fn section(&self) -> &'static str {
        match self {
            ContentType::Component => "Components",
            ContentType::Protocol => "Protocols",
            ContentType::Schematic => "Schematic Notes",
            ContentType::Specification => "Specifications",
            ContentType::Architecture => "Architecture",
            ContentType::Code => "Code",
        }
    }
}

const KEYWORDS: &[(ContentType, &[&str])] = &[
    (
        ContentType::Component,
        &[
            "component", "resistor", "capacitor", "sensor", "module", "ic", "chip", "regulator",
            "relay", "connector", "part number", "datasheet",
        ],
    ),
    (
        ContentType::Protocol,
        &[
            "protocol", "i2c", "spi", "uart", "mqtt", "http", "handshake", "baud", "packet",
            "message format",
        ],
    ),
    (
        ContentType::Schematic,
        &["schematic", "wiring", "pinout", "pin", "trace", "net", "ground plane", "layout"],
    ),
    (
        ContentType::Specification,
        &[
            "specification", "requirement", "tolerance", "rating", "spec", "constraint",
            "operating range", "shall",
        ],
    ),
    (
        ContentType::Architecture,
        &[
            "architecture", "overview", "design", "structure", "subsystem", "data flow",
            "high-level", "topology",
        ],
    ),
    (
        ContentType::Code,
        &["code", "function", "firmware", "library", "snippet", "implementation", "loop", "driver"],
    ),
];

/// Scores the content against each type's keywords; the highest score wins,
/// ties broken in favor of the type with the most raw keyword hits.
pub fn classify_content(content: &str) -> ContentType {
    let lower = content.to_lowercase();
    let mut best = (ContentType::Specification, 0usize, 0usize);
    for (content_type, keywords) in KEYWORDS {
        let hits: usize = keywords.iter().filter(|k| lower.contains(*k)).count();
        // Repeated mentions weigh in via occurrence count.
        let score: usize = keywords
            .iter()
            .map(|k| lower.matches(*k).count())
            .sum();
        if score > best.1 || (score == best.1 && hits > best.2) {
            best = (*content_type, score, hits);
        }
    }
    best.0
}
