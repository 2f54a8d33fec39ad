use std::fs;
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while writing rendered config text.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to write output file.
    #[error("failed to write config file: {0}")]
    Io(#[from] std::io::Error),
}

/// A section header and the statements rendered under it.
///
/// An empty header renders the statements without a path line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: String,
    pub lines: Vec<String>,
}

impl Block {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
        }
    }
}

/// Render a preamble of `#` comments followed by blocks separated by blank lines.
pub fn write(preamble: &[String], blocks: &[Block]) -> String {
    let mut out = Vec::new();
    for comment in preamble {
        out.push(format!("# {comment}"));
    }

    for block in blocks.iter().filter(|b| !b.lines.is_empty()) {
        if !out.is_empty() {
            out.push(String::new());
        }
        if !block.header.is_empty() {
            out.push(block.header.clone());
        }
        out.extend(block.lines.iter().cloned());
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Write rendered text to `path`.
pub fn write_file(text: &str, path: &Path) -> Result<(), WriteError> {
    fs::write(path, text)?;
    Ok(())
}
