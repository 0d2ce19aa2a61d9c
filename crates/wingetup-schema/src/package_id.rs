//! Package identifiers.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Suffix of checkver configuration files.
pub const CHECKVER_SUFFIX: &str = ".checkver.yaml";

/// Errors produced when validating a [`PackageId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PackageIdError {
    /// The identifier has no `Publisher.Package` separator.
    #[error("Invalid package identifier format: {0}")]
    MissingSeparator(String),

    /// One of the dot-separated segments is empty.
    #[error("Invalid package identifier: empty segment in '{0}'")]
    EmptySegment(String),

    /// Identifiers never contain whitespace.
    #[error("Invalid package identifier: whitespace in '{0}'")]
    Whitespace(String),

    /// The file name does not end in `.checkver.yaml`.
    #[error("Not a checkver file: {0}")]
    NotCheckver(String),
}

/// A `WinGet` package identifier in `Publisher.Package` form.
///
/// # Example
///
/// ```
/// use wingetup_schema::PackageId;
///
/// let id = PackageId::new("Microsoft.PowerShell").unwrap();
/// assert_eq!(id.publisher(), "Microsoft");
/// assert_eq!(id.name(), "PowerShell");
/// assert_eq!(id.manifest_path(), "manifests/m/Microsoft/PowerShell");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId(String);

impl PackageId {
    /// Create a new `PackageId`, validating the `Publisher.Package` format.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier has no dot, an empty segment, or
    /// contains whitespace.
    pub fn new(s: &str) -> Result<Self, PackageIdError> {
        if s.chars().any(char::is_whitespace) {
            return Err(PackageIdError::Whitespace(s.to_string()));
        }
        if !s.contains('.') {
            return Err(PackageIdError::MissingSeparator(s.to_string()));
        }
        if s.split('.').any(str::is_empty) {
            return Err(PackageIdError::EmptySegment(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Derive the identifier from a checkver file name.
    ///
    /// `Microsoft.PowerShell.checkver.yaml` becomes `Microsoft.PowerShell`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name lacks the checkver suffix or the
    /// remaining stem is not a valid identifier.
    pub fn from_checkver_path(path: &Path) -> Result<Self, PackageIdError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = file_name
            .strip_suffix(CHECKVER_SUFFIX)
            .ok_or_else(|| PackageIdError::NotCheckver(file_name.clone()))?;
        Self::new(stem)
    }

    /// The publisher segment (text before the first dot).
    pub fn publisher(&self) -> &str {
        self.0.split('.').next().unwrap_or("")
    }

    /// Everything after the publisher segment.
    pub fn name(&self) -> &str {
        self.0.split_once('.').map_or("", |(_, rest)| rest)
    }

    /// Upstream manifest directory for this package.
    ///
    /// Every dot becomes a path separator, not only the first one, prefixed
    /// by the lowercase first letter of the publisher. Nested identifiers
    /// therefore land where winget-pkgs keeps them:
    /// `Microsoft.VisualStudio.Code` maps to
    /// `manifests/m/Microsoft/VisualStudio/Code`.
    pub fn manifest_path(&self) -> String {
        let first = self
            .publisher()
            .chars()
            .next()
            .map(|c| c.to_lowercase().to_string())
            .unwrap_or_default();
        format!("manifests/{first}/{}", self.0.replace('.', "/"))
    }

    /// Branch name used for the pull request of `version`.
    pub fn branch_name(&self, version: &str) -> String {
        format!("{}-{version}", self.0)
    }

    /// Return the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageId {
    type Error = PackageIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.0
    }
}

impl std::str::FromStr for PackageId {
    type Err = PackageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn derives_manifest_path() {
        let id = PackageId::new("Seelen.SeelenUI").unwrap();
        assert_eq!(id.manifest_path(), "manifests/s/Seelen/SeelenUI");
    }

    #[test]
    fn nested_identifiers_become_nested_directories() {
        let id = PackageId::new("Microsoft.VisualStudio.Code").unwrap();
        assert_eq!(id.publisher(), "Microsoft");
        assert_eq!(id.name(), "VisualStudio.Code");
        assert_eq!(
            id.manifest_path(),
            "manifests/m/Microsoft/VisualStudio/Code"
        );
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(matches!(
            PackageId::new("NoDot"),
            Err(PackageIdError::MissingSeparator(_))
        ));
        assert!(matches!(
            PackageId::new("Trailing."),
            Err(PackageIdError::EmptySegment(_))
        ));
        assert!(matches!(
            PackageId::new("Has Space.Pkg"),
            Err(PackageIdError::Whitespace(_))
        ));
    }

    #[test]
    fn derives_from_checkver_file_name() {
        let path = PathBuf::from("manifests/Microsoft.PowerShell.checkver.yaml");
        let id = PackageId::from_checkver_path(&path).unwrap();
        assert_eq!(id.as_str(), "Microsoft.PowerShell");

        let bad = PathBuf::from("manifests/Microsoft.PowerShell.yaml");
        assert!(PackageId::from_checkver_path(&bad).is_err());
    }

    #[test]
    fn branch_name_joins_version() {
        let id = PackageId::new("UniKey.UniKey").unwrap();
        assert_eq!(id.branch_name("4.6.250531"), "UniKey.UniKey-4.6.250531");
    }
}
