//! Hash command

use std::path::PathBuf;

use anyhow::Result;
use wingetup_core::io::hash::hash_file;

/// Print the InstallerSha256 of each file.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let digest = hash_file(path)?;
        println!("{digest}  {}", path.display());
    }
    Ok(())
}
