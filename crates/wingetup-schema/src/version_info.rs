//! Check results passed between runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arch::Arch;
use crate::checkver::CheckverConfig;
use crate::package_id::PackageId;

/// Result of a successful version check, handed from `check` to `update`.
///
/// Serialized as JSON to the path given with `--output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Package being updated
    pub package_identifier: PackageId,
    /// Discovered upstream version (normalized)
    pub version: String,
    /// Primary installer URL (first architecture for multi-arch packages)
    pub installer_url: String,
    /// Per-architecture installer URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_urls: Option<BTreeMap<Arch, String>>,
    /// Release notes text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    /// Release notes URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes_url: Option<String>,
    /// Values captured during discovery (named regex groups, release data)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// The configuration the check ran with
    #[serde(rename = "checkver_config")]
    pub checkver_config: CheckverConfig,
}

impl VersionInfo {
    /// Installer URLs keyed by architecture.
    ///
    /// Single-installer packages report their one URL under [`Arch::X64`].
    pub fn urls_by_arch(&self) -> BTreeMap<Arch, String> {
        match &self.installer_urls {
            Some(urls) if !urls.is_empty() => urls.clone(),
            _ => BTreeMap::from([(Arch::X64, self.installer_url.clone())]),
        }
    }

    /// Whether this release ships one installer per architecture.
    pub fn is_multi_arch(&self) -> bool {
        self.installer_urls.as_ref().is_some_and(|u| !u.is_empty())
    }
}
