//! Opaque compliance baseline appended to translated output on request.

use std::path::{Path, PathBuf};

use thiserror::Error;

const EMBEDDED_BASELINE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/compliance/baseline.rsc"
));

#[derive(Debug, Error)]
#[error("failed to read compliance baseline {path}: {source}")]
pub struct ComplianceLoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceBlock {
    text: String,
    source: String,
}

impl ComplianceBlock {
    pub fn embedded() -> Self {
        Self {
            text: EMBEDDED_BASELINE.to_string(),
            source: "embedded".to_string(),
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ComplianceLoadError> {
        let Some(path) = path else {
            return Ok(Self::embedded());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ComplianceLoadError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            text,
            source: format!("file:{}", path.display()),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Append the block after `config`, separated by a blank line.
    pub fn append_to(&self, config: &str) -> String {
        let block = self.text.trim_end();
        if block.is_empty() {
            return config.to_string();
        }
        let mut out = config.trim_end().to_string();
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(block);
        out.push('\n');
        out
    }
}
