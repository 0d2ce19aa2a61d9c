//! Fresh manifest sets for packages configured with the legacy fields.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use wingetup_schema::{CheckverConfig, DEFAULT_LOCALE, InstallerSha256, MANIFEST_VERSION, PackageId};

use super::ManifestError;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct VersionManifest<'a> {
    package_identifier: &'a str,
    package_version: &'a str,
    default_locale: &'a str,
    manifest_type: &'a str,
    manifest_version: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstallerManifest<'a> {
    package_identifier: &'a str,
    package_version: &'a str,
    installers: Vec<Installer<'a>>,
    manifest_type: &'a str,
    manifest_version: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Installer<'a> {
    architecture: &'a str,
    installer_type: &'a str,
    installer_url: &'a str,
    installer_sha256: &'a InstallerSha256,
    product_code: &'a str,
    scope: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LocaleManifest<'a> {
    package_identifier: &'a str,
    package_version: &'a str,
    package_locale: &'a str,
    publisher: &'a str,
    package_name: &'a str,
    license: &'a str,
    short_description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_notes_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
    manifest_type: &'a str,
    manifest_version: &'a str,
}

/// Files written by [`write`].
#[derive(Debug, Clone)]
pub struct GeneratedManifests {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// `<root>/<p>/<Publisher>/<Package>/<version>`.
pub fn version_dir(root: &Path, id: &PackageId, version: &str) -> PathBuf {
    let relative = id.manifest_path();
    let relative = relative.strip_prefix("manifests/").unwrap_or(&relative);
    root.join(relative).join(version)
}

/// Render the version, installer and default-locale manifests as
/// `(file name, content)` pairs.
///
/// # Errors
///
/// Returns an error if the config has no identifier or serialization fails.
pub fn render(
    config: &CheckverConfig,
    version: &str,
    installer_url: &str,
    sha256: &InstallerSha256,
) -> Result<Vec<(String, String)>, ManifestError> {
    let id = config.id()?;
    let id_str = id.as_str();

    let version_manifest = VersionManifest {
        package_identifier: id_str,
        package_version: version,
        default_locale: DEFAULT_LOCALE,
        manifest_type: "version",
        manifest_version: MANIFEST_VERSION,
    };

    let installer_manifest = InstallerManifest {
        package_identifier: id_str,
        package_version: version,
        installers: vec![Installer {
            architecture: config.architecture.as_deref().unwrap_or("x64"),
            installer_type: config.installer_type.as_deref().unwrap_or("msi"),
            installer_url,
            installer_sha256: sha256,
            product_code: config.product_code.as_deref().unwrap_or("{PRODUCTCODE}"),
            scope: "machine",
        }],
        manifest_type: "installer",
        manifest_version: MANIFEST_VERSION,
    };

    let default_name = id_str.rsplit('.').next().unwrap_or(id_str);
    let locale_manifest = LocaleManifest {
        package_identifier: id_str,
        package_version: version,
        package_locale: DEFAULT_LOCALE,
        publisher: config.publisher.as_deref().unwrap_or("Unknown"),
        package_name: config.package_name.as_deref().unwrap_or(default_name),
        license: config.license.as_deref().unwrap_or("Proprietary"),
        short_description: config.short_description.as_deref().unwrap_or(""),
        description: config.description.as_deref(),
        release_notes_url: config.release_notes_url.as_deref(),
        tags: (!config.tags.is_empty()).then_some(config.tags.as_slice()),
        manifest_type: "defaultLocale",
        manifest_version: MANIFEST_VERSION,
    };

    Ok(vec![
        (format!("{id}.yaml"), serde_yaml::to_string(&version_manifest)?),
        (
            format!("{id}.installer.yaml"),
            serde_yaml::to_string(&installer_manifest)?,
        ),
        (
            format!("{id}.locale.{DEFAULT_LOCALE}.yaml"),
            serde_yaml::to_string(&locale_manifest)?,
        ),
    ])
}

/// Render and write the three manifests under `output_dir`.
///
/// # Errors
///
/// Returns an error if rendering fails or a file cannot be written.
pub fn write(
    config: &CheckverConfig,
    version: &str,
    installer_url: &str,
    sha256: &InstallerSha256,
    output_dir: &Path,
) -> Result<GeneratedManifests, ManifestError> {
    let dir = version_dir(output_dir, config.id()?, version);
    std::fs::create_dir_all(&dir).map_err(|source| ManifestError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut files = Vec::new();
    for (name, content) in render(config, version, installer_url, sha256)? {
        let path = dir.join(name);
        std::fs::write(&path, content).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        info!("created {}", path.display());
        files.push(path);
    }

    Ok(GeneratedManifests { dir, files })
}
