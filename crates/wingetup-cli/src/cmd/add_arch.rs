//! Add-arch command

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use wingetup_core::check::published_versions;
use wingetup_core::config::load_checkver;
use wingetup_core::manifest::{self, ManifestUpdate};
use wingetup_core::template::{self, InstallerUrls};
use wingetup_core::update::{UpdateRequest, hash_installers};
use wingetup_core::{CheckContext, discovery};
use wingetup_schema::{UPSTREAM_BRANCH, UPSTREAM_REPO, version};

/// Rebuild the latest upstream installer manifest for the current release,
/// adding every configured architecture it lacks.
pub async fn add_arch(checkver: &Path, output: Option<&Path>, token: Option<String>) -> Result<()> {
    let config = load_checkver(checkver)?;
    let id = config.id()?.clone();
    let ctx = CheckContext::new(token)?;

    let versions = published_versions(&ctx.github, &config).await?;
    let Some(published) = version::latest(&versions) else {
        bail!("no published versions of {id} in {UPSTREAM_REPO}");
    };
    println!("  latest published: {published}");

    let path = format!("{}/{published}/{id}.installer.yaml", config.manifest_dir());
    let content = ctx
        .github
        .raw_file(UPSTREAM_REPO, UPSTREAM_BRANCH, &path)
        .await?
        .with_context(|| format!("{path} not found in {UPSTREAM_REPO}"))?;

    let source = discovery::source_for(&config, &ctx.github)?;
    let Some(found) = source.discover().await? else {
        bail!("could not determine the latest version of {id}");
    };
    println!("  current release: {}", found.version);

    let InstallerUrls::PerArch(urls) = template::installer_urls(&config, &found.version, &found.metadata)? else {
        bail!("installerUrlTemplate must map architectures to URLs");
    };

    let request = UpdateRequest {
        package_id: id.clone(),
        version: found.version.clone(),
        manifest_dir: config.manifest_dir(),
        installer_url: urls.values().next().cloned().unwrap_or_default(),
        installer_urls: Some(urls.clone()),
        release_notes: None,
        release_notes_url: None,
        template_commit: None,
        template_version: None,
    };
    let digests = hash_installers(&ctx.http, &request).await?;
    for (arch, sha) in &digests.by_arch {
        println!("  {arch}: {sha}");
    }

    let hashed: BTreeMap<_, _> = urls
        .into_iter()
        .filter(|(arch, _)| digests.by_arch.contains_key(arch))
        .collect();

    let before = manifest::manifest_architectures(&content);
    let content = manifest::add_missing_architectures(&content, &digests.by_arch, &hashed);
    for arch in hashed.keys().filter(|a| !before.contains(*a)) {
        println!("  added {arch}");
    }

    let update = ManifestUpdate {
        arch_urls: hashed,
        arch_hashes: digests.by_arch,
        product_codes: digests.product_codes,
        ..ManifestUpdate::new(found.version)
    };
    let content = manifest::update_content(&content, &update);

    for warning in manifest::validate(&content)? {
        println!("  warning: {warning}");
    }

    let output = output.map_or_else(|| PathBuf::from(format!("{id}.installer.yaml")), Path::to_path_buf);
    std::fs::write(&output, &content).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("  saved {}", output.display());
    Ok(())
}
