//! Checkver configuration format.
//!
//! A checkver file (`<PackageId>.checkver.yaml`) tells the updater how to find
//! the latest upstream version of one package and how to turn that version
//! into installer URLs.
//!
//! ```yaml
//! checkver:
//!   type: script
//!   script: (Invoke-WebRequest https://example.com/download).Content
//!   regex: 'app-(?<build>\d+)-v([\d.]+)\.msi'
//! installerUrlTemplate:
//!   x64: https://example.com/app-{build}-v{version}-x64.msi
//!   arm64: https://example.com/app-{build}-v{version}-arm64.msi
//! updateMetadata:
//!   - ReleaseNotesUrl
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arch::Arch;
use crate::package_id::{PackageId, PackageIdError};

/// Errors produced while loading a checkver configuration.
#[derive(thiserror::Error, Debug)]
pub enum CheckverError {
    /// The YAML could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The package identifier is missing or malformed.
    #[error(transparent)]
    PackageId(#[from] PackageIdError),

    /// No identifier in the file and no path to derive it from.
    #[error("packageIdentifier is missing and cannot be derived")]
    MissingIdentifier,

    /// The config names no way of discovering versions.
    #[error("no version discovery method configured for {0}")]
    MissingMethod(String),

    /// `checkver: <name>` with an unsupported name.
    #[error("unknown checkver method '{0}'")]
    UnknownMethod(String),

    /// A field the selected method needs is absent or empty.
    #[error("missing required field '{field}' for {package}")]
    MissingField {
        /// Offending package
        package: String,
        /// Name of the absent field
        field: &'static str,
    },
}

/// `installerUrlTemplate`: one URL, or one URL per architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlTemplate {
    /// Single-installer package
    Single(String),
    /// Multi-architecture package
    PerArch(BTreeMap<Arch, String>),
}

/// The `checkver` field as written in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckverSpec {
    /// Shorthand such as `checkver: github`, configured by a sibling section.
    Named(String),
    /// Fully specified method.
    Typed(TypedCheckver),
}

/// A fully specified `checkver` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypedCheckver {
    /// Run a `PowerShell` script and apply a regex to its output.
    Script {
        /// `PowerShell` source passed to `pwsh -Command`.
        script: String,
        /// Regex applied to the script output.
        regex: String,
        /// Optional `${N}` replacement template for the version.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replace: Option<String>,
    },
    /// Latest GitHub release of `owner/repo`.
    Github {
        /// Repository in `owner/repo` format.
        repo: String,
        /// Append `.0` to three-part versions.
        #[serde(rename = "appendDotZero", default)]
        append_dot_zero: bool,
    },
    /// Scrape a web page for a version number.
    Web {
        /// Page to scrape; falls back to the top-level `checkUrl`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

/// Top-level `github:` section used with `checkver: github`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSection {
    /// Repository owner
    #[serde(default)]
    pub owner: String,
    /// Repository name
    #[serde(default)]
    pub repo: String,
    /// Append `.0` to three-part versions.
    #[serde(default)]
    pub append_dot_zero: bool,
}

/// A resolved version discovery method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckverMethod {
    /// `PowerShell` script plus regex.
    Script {
        /// `PowerShell` source
        script: String,
        /// Regex applied to the output
        regex: String,
        /// Optional `${N}` replacement template
        replace: Option<String>,
    },
    /// GitHub latest release.
    GitHub {
        /// `owner/repo`
        repo: String,
        /// Append `.0` to three-part versions
        append_dot_zero: bool,
    },
    /// Web page scraping.
    Web {
        /// Page to fetch
        url: String,
    },
}

/// A checkver configuration with derived fields filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckverConfig {
    /// Package identifier; derived from the file name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_identifier: Option<PackageId>,
    /// Upstream manifest directory; derived from the identifier when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,
    /// Version discovery method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkver: Option<CheckverSpec>,
    /// Sibling section for `checkver: github`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSection>,
    /// Legacy web check URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_url: Option<String>,
    /// Installer URL template(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_url_template: Option<UrlTemplate>,
    /// Legacy single installer URL pattern (`{version}` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_url_pattern: Option<String>,
    /// Manifest fields to refresh from the release (`ReleaseNotes`, `ReleaseNotesUrl`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_metadata: Vec<String>,
    /// Static release notes fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    /// Static release notes URL fallback; may contain placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes_url: Option<String>,
    /// Upstream commit holding a template version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_commit: Option<String>,
    /// Version directory to use as template at `template_commit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_version: Option<String>,

    // Fields used when generating manifests from scratch.
    /// Installer architecture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    /// Installer type (`msi`, `exe`, `msix`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_type: Option<String>,
    /// MSI product code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    /// Publisher display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Package display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// License
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Short description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// Long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CheckverConfig {
    /// Parse a checkver YAML document.
    ///
    /// When `path` is given and the document has no `packageIdentifier`, the
    /// identifier is derived from the file name. `manifestPath` is derived
    /// from the identifier when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or no identifier can be
    /// determined.
    pub fn parse(content: &str, path: Option<&Path>) -> Result<Self, CheckverError> {
        let mut config: Self = serde_yaml::from_str(content)?;

        if config.package_identifier.is_none() {
            let path = path.ok_or(CheckverError::MissingIdentifier)?;
            config.package_identifier = Some(PackageId::from_checkver_path(path)?);
        }

        if config.manifest_path.is_none() {
            config.manifest_path = config.package_identifier.as_ref().map(PackageId::manifest_path);
        }

        Ok(config)
    }

    /// The package identifier.
    ///
    /// # Errors
    ///
    /// Returns an error for configs built without [`Self::parse`] that lack one.
    pub fn id(&self) -> Result<&PackageId, CheckverError> {
        self.package_identifier
            .as_ref()
            .ok_or(CheckverError::MissingIdentifier)
    }

    /// Upstream manifest directory (`manifests/p/Publisher/Package`).
    pub fn manifest_dir(&self) -> String {
        match (&self.manifest_path, &self.package_identifier) {
            (Some(path), _) => path.clone(),
            (None, Some(id)) => id.manifest_path(),
            (None, None) => String::new(),
        }
    }

    /// Resolve the discovery method.
    ///
    /// # Errors
    ///
    /// Returns an error when no method is configured, the shorthand name is
    /// unknown, or a field the method needs is empty.
    pub fn method(&self) -> Result<CheckverMethod, CheckverError> {
        let package = self
            .package_identifier
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        let missing = |field: &'static str| CheckverError::MissingField {
            package: package.clone(),
            field,
        };

        match &self.checkver {
            Some(CheckverSpec::Typed(TypedCheckver::Script {
                script,
                regex,
                replace,
            })) => {
                if script.trim().is_empty() {
                    return Err(missing("script"));
                }
                if regex.is_empty() {
                    return Err(missing("regex"));
                }
                Ok(CheckverMethod::Script {
                    script: script.clone(),
                    regex: regex.clone(),
                    replace: replace.clone().filter(|r| !r.is_empty()),
                })
            }
            Some(CheckverSpec::Typed(TypedCheckver::Github {
                repo,
                append_dot_zero,
            })) => {
                if repo.is_empty() {
                    return Err(missing("repo"));
                }
                Ok(CheckverMethod::GitHub {
                    repo: repo.clone(),
                    append_dot_zero: *append_dot_zero,
                })
            }
            Some(CheckverSpec::Typed(TypedCheckver::Web { url })) => {
                let url = url
                    .clone()
                    .or_else(|| self.check_url.clone())
                    .ok_or_else(|| missing("checkUrl"))?;
                Ok(CheckverMethod::Web { url })
            }
            Some(CheckverSpec::Named(name)) if name == "github" => {
                let section = self.github.as_ref().ok_or_else(|| missing("github"))?;
                if section.owner.is_empty() {
                    return Err(missing("github.owner"));
                }
                if section.repo.is_empty() {
                    return Err(missing("github.repo"));
                }
                Ok(CheckverMethod::GitHub {
                    repo: format!("{}/{}", section.owner, section.repo),
                    append_dot_zero: section.append_dot_zero,
                })
            }
            Some(CheckverSpec::Named(name)) => Err(CheckverError::UnknownMethod(name.clone())),
            None => match &self.check_url {
                Some(url) => Ok(CheckverMethod::Web { url: url.clone() }),
                None => Err(CheckverError::MissingMethod(package)),
            },
        }
    }

    /// Whether `updateMetadata` requests `field`.
    pub fn wants_metadata(&self, field: &str) -> bool {
        self.update_metadata.iter().any(|f| f == field)
    }
}
