//! Tokenized source configuration.

use ros_config_core::parser::{parse, Comment, LineKind};
use ros_config_core::statement::Statement;
use serde::Serialize;

use crate::detect::{
    detect_model, detect_version, infer_dialect, with_override, Detection, Dialect,
};
use crate::section::Section;

/// One logical line of the source export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLine {
    /// 1-based physical line number of the first line of the statement.
    pub line_index: usize,
    pub kind: LineKind,
    /// Section path in effect for this line.
    pub path: Option<String>,
    /// Statement text without its path.
    pub text: String,
    pub raw_text: String,
    /// `None` when the statement has unbalanced quotes or brackets.
    pub statement: Option<Statement>,
    /// Section implied by the path alone; refined by the classifier.
    pub section: Section,
}

impl ConfigLine {
    pub fn is_header(&self) -> bool {
        self.kind == LineKind::Header
    }
}

/// Immutable tokenized view of an export.
#[derive(Debug, Clone, Serialize)]
pub struct SourceConfig {
    #[serde(skip)]
    pub text: String,
    pub version: Detection,
    pub model: Detection,
    pub dialect: Dialect,
    pub comments: Vec<Comment>,
    pub lines: Vec<ConfigLine>,
}

impl SourceConfig {
    pub fn statements(&self) -> impl Iterator<Item = &ConfigLine> {
        self.lines.iter().filter(|line| !line.is_header())
    }
}

/// Tokenize export text. Never fails: malformed statements are kept verbatim.
pub fn tokenize(text: &str, version_hint: Option<&str>, model_hint: Option<&str>) -> SourceConfig {
    let doc = parse(text);
    let version = with_override(detect_version(&doc.comments), version_hint);
    let model = with_override(detect_model(&doc.comments), model_hint);
    let dialect = Dialect::from_version(&version.value)
        .or_else(|| Dialect::from_version(&infer_dialect(&doc).value))
        .unwrap_or(Dialect::Legacy);

    let lines = doc
        .lines
        .iter()
        .map(|line| ConfigLine {
            line_index: line.index,
            kind: line.kind,
            path: line.path.clone(),
            text: line.text.clone(),
            raw_text: line.raw.clone(),
            statement: match line.kind {
                LineKind::Header => None,
                LineKind::Statement => Statement::parse(&line.text).ok(),
            },
            section: line
                .path
                .as_deref()
                .map(Section::from_path)
                .unwrap_or(Section::Unassigned),
        })
        .collect();

    SourceConfig {
        text: text.to_string(),
        version,
        model,
        dialect,
        comments: doc.comments,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::tokenize;
    use crate::detect::Dialect;
    use crate::section::Section;

    #[test]
    fn keeps_malformed_statements_verbatim() {
        let source = tokenize("/ip address\nadd comment=\"broken address=10.0.0.1/24\n", None, None);
        let line = &source.lines[1];
        assert!(line.statement.is_none());
        assert_eq!(line.raw_text, "add comment=\"broken address=10.0.0.1/24");
        assert_eq!(line.section, Section::IpAddress);
    }

    #[test]
    fn override_wins_over_header() {
        let source = tokenize("# by RouterOS 6.48.6\n/system identity\nset name=r1\n", Some("7.12"), None);
        assert_eq!(source.version.value, "7.12");
        assert_eq!(source.version.source, "request");
        assert_eq!(source.dialect, Dialect::Modern);
    }

    #[test]
    fn unknown_version_infers_dialect() {
        let source = tokenize("/routing ospf interface-template\nadd interfaces=ether1\n", None, None);
        assert_eq!(source.version.value, "unknown");
        assert_eq!(source.dialect, Dialect::Modern);
    }
}
