//! Update command

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;
use wingetup_core::config::load_checkver;
use wingetup_core::update::{RunOptions, RunOutcome, run_update};
use wingetup_schema::VersionInfo;

/// Update the manifests for the version described in `version_info`.
///
/// The checkver file on disk takes precedence over the config embedded in
/// the version info when both name the same package.
pub async fn update(checkver: &Path, version_info: &Path, options: &RunOptions) -> Result<()> {
    let content = std::fs::read_to_string(version_info)
        .with_context(|| format!("Failed to read {}", version_info.display()))?;
    let mut info: VersionInfo = serde_json::from_str(&content)
        .with_context(|| format!("Invalid version info {}", version_info.display()))?;

    match load_checkver(checkver) {
        Ok(config) if config.package_identifier.as_ref() == Some(&info.package_identifier) => {
            info.checkver_config = config;
        }
        Ok(config) => warn!(
            "{} configures {}, not {}; using the embedded config",
            checkver.display(),
            config
                .package_identifier
                .as_ref()
                .map_or_else(|| "nothing".to_string(), ToString::to_string),
            info.package_identifier
        ),
        Err(e) => warn!("{e}; using the embedded config"),
    }

    println!("  updating {} to {}", info.package_identifier, info.version);

    match run_update(&info, options).await? {
        RunOutcome::Skipped(pr) => println!(
            "  skipped: PR #{} already {} ({})",
            pr.number,
            pr.state.to_lowercase(),
            pr.title
        ),
        RunOutcome::Updated(manifests) => {
            for file in &manifests.files {
                println!("  updated {}", file.display());
            }
        }
        RunOutcome::Pushed { branch } => println!("  pushed {branch}"),
        RunOutcome::PrCreated { branch, url } => {
            println!("  pushed {branch}");
            println!("  created {url}");
        }
    }
    Ok(())
}
