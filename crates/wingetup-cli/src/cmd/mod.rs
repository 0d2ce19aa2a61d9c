//! Command implementations

pub mod add_arch;
pub mod check;
pub mod completions;
pub mod generate;
pub mod hash;
pub mod new;
pub mod update;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Append `key=value` lines to a GitHub Actions output file.
pub(crate) fn append_github_output(path: &Path, pairs: &[(&str, &str)]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for (key, value) in pairs {
        writeln!(file, "{key}={value}")
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
