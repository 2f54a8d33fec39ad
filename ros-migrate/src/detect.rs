use once_cell::sync::Lazy;
use regex::Regex;
use ros_config_core::parser::{normalize_path, Comment, Document, LineKind};
use serde::Serialize;

static VERSION_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bby\s+RouterOS\s+(\d+(?:\.\d+)*)").expect("valid version regex")
});
static MODEL_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^model\s*=\s*(\S+)").expect("valid model regex"));

/// Value reported when detection finds nothing.
pub const UNKNOWN: &str = "unknown";

/// Detection result with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub value: String,
    pub source: String,
    pub confidence: String,
}

impl Detection {
    fn new(value: &str, source: &str, confidence: &str) -> Self {
        Self {
            value: value.to_string(),
            source: source.to_string(),
            confidence: confidence.to_string(),
        }
    }

    fn unknown() -> Self {
        Self::new(UNKNOWN, "none", "low")
    }

    pub fn is_known(&self) -> bool {
        self.value != UNKNOWN
    }
}

/// Configuration syntax family: RouterOS 6 (`Legacy`) or RouterOS 7 (`Modern`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Legacy,
    Modern,
}

impl Dialect {
    /// Dialect for a firmware version string such as `6.49.2` or `7`.
    pub fn from_version(version: &str) -> Option<Dialect> {
        match parse_major(version)? {
            0..=6 => Some(Dialect::Legacy),
            _ => Some(Dialect::Modern),
        }
    }

    pub fn major(self) -> u32 {
        match self {
            Dialect::Legacy => 6,
            Dialect::Modern => 7,
        }
    }
}

/// Leading numeric component of a version string.
pub fn parse_major(version: &str) -> Option<u32> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    version.split('.').next()?.parse().ok()
}

/// Detect the firmware version from `# ... by RouterOS X.Y.Z` header comments.
pub fn detect_version(comments: &[Comment]) -> Detection {
    comments
        .iter()
        .find_map(|comment| VERSION_COMMENT.captures(&comment.text))
        .map(|caps| Detection::new(&caps[1], "header-comment", "high"))
        .unwrap_or_else(Detection::unknown)
}

/// Detect the router model from a `# model = ...` header comment.
pub fn detect_model(comments: &[Comment]) -> Detection {
    comments
        .iter()
        .find_map(|comment| MODEL_COMMENT.captures(comment.text.trim()))
        .map(|caps| Detection::new(&caps[1], "header-comment", "high"))
        .unwrap_or_else(Detection::unknown)
}

/// Apply an explicit override, falling back to detection.
pub fn with_override(detected: Detection, hint: Option<&str>) -> Detection {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(value) => Detection::new(value, "request", "high"),
        None => detected,
    }
}

/// Infer the dialect from section headers when no version is known.
pub fn infer_dialect(doc: &Document) -> Detection {
    const MODERN: &[&str] = &[
        "/routing ospf interface-template",
        "/routing bgp connection",
        "/routing bgp template",
        "/routing bfd configuration",
    ];
    const LEGACY: &[&str] = &[
        "/routing ospf interface",
        "/routing ospf network",
        "/routing bgp peer",
        "/routing bgp instance",
        "/routing bgp network",
    ];

    let mut legacy_hits = 0usize;
    for line in doc.lines.iter().filter(|l| l.kind == LineKind::Header) {
        let Some(path) = line.path.as_deref().map(normalize_path) else {
            continue;
        };
        if MODERN.contains(&path.as_str()) {
            return Detection::new("7", "section-headers", "medium");
        }
        if LEGACY.contains(&path.as_str()) {
            legacy_hits += 1;
        }
    }

    if legacy_hits > 0 {
        Detection::new("6", "section-headers", "medium")
    } else {
        Detection::new("6", "default", "low")
    }
}
