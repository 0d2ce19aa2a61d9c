//! Generate command

use std::path::Path;

use anyhow::{Context, Result};
use wingetup_core::config::load_checkver;
use wingetup_core::io::download;
use wingetup_core::manifest::generate;

use super::append_github_output;

/// Hash the installer and write a fresh manifest set.
pub async fn generate(
    config: &Path,
    version: &str,
    installer_url: &str,
    output_dir: &Path,
    github_output: Option<&Path>,
) -> Result<()> {
    let config = load_checkver(config)?;
    let http = download::client()?;

    let downloaded = download::hash_url(&http, installer_url)
        .await
        .with_context(|| format!("Failed to hash {installer_url}"))?;
    println!("  InstallerSha256: {}", downloaded.sha256);

    let generated = generate::write(&config, version, installer_url, &downloaded.sha256, output_dir)?;
    for file in &generated.files {
        println!("  created {}", file.display());
    }

    if let Some(path) = github_output {
        let dir = generated.dir.display().to_string();
        append_github_output(path, &[("manifest_path", dir.as_str())])?;
    }
    Ok(())
}
