//! Shared types for wingetup.
//!
//! Everything here is IO-free: identifiers, architectures, digests, version
//! ordering, the checkver configuration format and the version info document
//! handed from `check` to `update`.

pub mod arch;
pub mod checkver;
pub mod hash;
pub mod package_id;
pub mod version;
pub mod version_info;

// Re-exports
pub use arch::*;
pub use checkver::{CheckverConfig, CheckverError, CheckverMethod, UrlTemplate};
pub use hash::*;
pub use package_id::{PackageId, PackageIdError};
pub use version_info::VersionInfo;

/// Upstream manifest repository that pull requests are opened against.
pub const UPSTREAM_REPO: &str = "microsoft/winget-pkgs";

/// Default branch of the upstream manifest repository.
pub const UPSTREAM_BRANCH: &str = "master";

/// Manifest schema version written by the manifest generator.
pub const MANIFEST_VERSION: &str = "1.6.0";

/// Default locale used for generated locale manifests.
pub const DEFAULT_LOCALE: &str = "en-US";
