use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Refuse an output path that resolves to the input file.
pub fn ensure_distinct_output(output: &Path, input: &Path) -> Result<()> {
    let out = resolve(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;
    let src = resolve(input)
        .with_context(|| format!("failed to resolve input path {}", input.display()))?;
    if out == src {
        bail!(
            "refusing to overwrite source config: output {} is the input {}",
            output.display(),
            input.display()
        );
    }
    Ok(())
}

fn resolve(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("canonicalize {}", path.display()));
    }
    // Not created yet: `..` components are left as written.
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().context("current_dir")?
    };
    Ok(base.join(path))
}
