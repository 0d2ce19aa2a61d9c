//! Core library for wingetup.
//!
//! Version discovery, installer hashing, text-level manifest editing and the
//! git / GitHub plumbing that turns a new upstream release into a pull
//! request against `microsoft/winget-pkgs`.

pub mod check;
pub mod config;
pub mod discovery;
pub mod git;
pub mod github;
pub mod io;
pub mod manifest;
pub mod pr;
pub mod process;
pub mod template;
pub mod update;

pub use check::{CheckContext, check_package};
pub use discovery::{Discovered, VersionSource};
pub use update::{UpdateError, UpdateRequest, update_manifests};

/// User Agent string for API and download requests
pub const USER_AGENT: &str = concat!("wingetup/", env!("CARGO_PKG_VERSION"));

/// User Agent sent when scraping vendor web pages
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
