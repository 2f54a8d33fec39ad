use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while reading an export file.
///
/// Tokenizing itself never fails: malformed statements are kept verbatim.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read input file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Input bytes were not valid UTF-8.
    #[error("config file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Verbs that end the path part of an inline `/path verb ...` statement.
pub const VERBS: &[&str] = &[
    "add", "set", "remove", "enable", "disable", "print", "export", "edit", "move", "unset",
    "reset", "comment", "find",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    /// A bare section path such as `/ip address`.
    Header,
    /// A command executed inside a section.
    Statement,
}

/// A `#` comment line with the marker stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub line: usize,
    pub text: String,
}

/// One logical line after continuation joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalLine {
    /// 1-based physical line of the first line of this statement.
    pub index: usize,
    pub kind: LineKind,
    /// Section path in effect (for headers, the header itself).
    pub path: Option<String>,
    /// Statement text without its path; empty for headers.
    pub text: String,
    /// Joined source text exactly as it appeared, path included.
    pub raw: String,
}

/// Tokenized export document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub comments: Vec<Comment>,
    pub lines: Vec<LogicalLine>,
}

impl Document {
    /// Statement lines only, in source order.
    pub fn statements(&self) -> impl Iterator<Item = &LogicalLine> {
        self.lines.iter().filter(|l| l.kind == LineKind::Statement)
    }
}

/// Tokenize export text into logical lines.
pub fn parse(text: &str) -> Document {
    let mut doc = Document::default();
    let mut active: Option<String> = None;
    let mut pending: Option<(usize, String)> = None;

    for (idx, physical) in text.lines().enumerate() {
        let number = idx + 1;
        let trimmed = physical.trim();

        let (start, mut joined) = match pending.take() {
            Some((start, mut acc)) => {
                acc.push_str(trimmed);
                (start, acc)
            }
            None => {
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(comment) = trimmed.strip_prefix('#') {
                    doc.comments.push(Comment {
                        line: number,
                        text: comment.trim().to_string(),
                    });
                    continue;
                }
                (number, trimmed.to_string())
            }
        };

        if let Some(stripped) = joined.strip_suffix('\\') {
            joined = stripped.to_string();
            pending = Some((start, joined));
            continue;
        }

        push_logical(&mut doc, &mut active, start, joined);
    }

    if let Some((start, joined)) = pending {
        push_logical(&mut doc, &mut active, start, joined);
    }
    doc
}

/// Read and tokenize an export file.
pub fn parse_file(path: &Path) -> Result<Document, ParseError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes)?;
    Ok(parse(&text))
}

fn push_logical(doc: &mut Document, active: &mut Option<String>, index: usize, raw: String) {
    let raw = raw.trim().to_string();
    if !raw.starts_with('/') {
        doc.lines.push(LogicalLine {
            index,
            kind: LineKind::Statement,
            path: active.clone(),
            text: raw.clone(),
            raw,
        });
        return;
    }

    let (path, rest) = split_path(&raw);
    if rest.is_empty() {
        *active = Some(path.clone());
        doc.lines.push(LogicalLine {
            index,
            kind: LineKind::Header,
            path: Some(path),
            text: String::new(),
            raw,
        });
        return;
    }

    doc.lines.push(LogicalLine {
        index,
        kind: LineKind::Statement,
        path: Some(path),
        text: rest,
        raw,
    });
}

/// Split `/ip firewall filter add chain=input` into the normalized path and
/// the remaining statement text.
pub fn split_path(line: &str) -> (String, String) {
    let mut path = Vec::new();
    let mut words = line.split_whitespace().peekable();
    while let Some(word) = words.peek() {
        if VERBS.contains(word) || word.contains('=') || word.starts_with('[') {
            break;
        }
        path.push(*word);
        words.next();
    }
    let rest = words.collect::<Vec<_>>().join(" ");
    (normalize_path(&path.join(" ")), rest)
}

/// Collapse whitespace and lowercase a section path.
pub fn normalize_path(path: &str) -> String {
    path.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}
