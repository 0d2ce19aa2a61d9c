//! Latest-version discovery.
//!
//! Each checkver method maps to a [`VersionSource`]. A source returns
//! `Ok(None)` when it ran but found nothing; errors are reserved for
//! misconfiguration and transport failures.

mod github;
mod script;
mod web;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use wingetup_schema::{CheckverConfig, CheckverError, CheckverMethod, version};

use crate::github::{Client as GitHubClient, GitHubError};
use crate::process::CommandError;
use crate::template::ReleaseInfo;

pub use github::GitHubSource;
pub use script::{ScriptSource, extract_version};
pub use web::{WebSource, scrape_version};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Config(#[from] CheckverError),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A discovered upstream version plus values captured along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    pub version: String,
    pub metadata: BTreeMap<String, String>,
}

impl Discovered {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            metadata: BTreeMap::new(),
        }
    }
}

#[async_trait]
pub trait VersionSource: Send + Sync + std::fmt::Debug {
    /// Short method name for logs (`script`, `github`, `web`).
    fn kind(&self) -> &'static str;

    /// Find the latest version.
    async fn discover(&self) -> Result<Option<Discovered>, DiscoveryError>;
}

/// Build the source configured by `config`.
///
/// # Errors
///
/// Returns an error when the config has no usable discovery method or the
/// script regex does not compile.
pub fn source_for(
    config: &CheckverConfig,
    github: &GitHubClient,
) -> Result<Box<dyn VersionSource>, DiscoveryError> {
    let source: Box<dyn VersionSource> = match config.method()? {
        CheckverMethod::Script {
            script,
            regex,
            replace,
        } => Box::new(ScriptSource::new(script, &regex, replace)?),
        CheckverMethod::GitHub {
            repo,
            append_dot_zero,
        } => Box::new(GitHubSource {
            client: github.clone(),
            repo,
            append_dot_zero,
            want_notes: config.wants_metadata("ReleaseNotes"),
            want_notes_url: config.wants_metadata("ReleaseNotesUrl"),
        }),
        CheckverMethod::Web { url } => Box::new(WebSource::new(url)?),
    };
    debug!("using {} discovery", source.kind());
    Ok(source)
}

static GITHUB_RELEASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/repos/([^/]+)/([^/]+)/releases").expect("static regex")
});

/// Release notes for script-based packages whose script queries the GitHub
/// releases API. The release is looked up by tag `v<short version>`.
///
/// Failures are logged and yield `None`.
pub async fn script_release_info(
    config: &CheckverConfig,
    version: &str,
    github: &GitHubClient,
) -> Option<ReleaseInfo> {
    let Ok(CheckverMethod::Script { script, .. }) = config.method() else {
        return None;
    };
    let caps = GITHUB_RELEASES.captures(&script)?;
    let repo = format!("{}/{}", &caps[1], &caps[2]);
    let tag = format!("v{}", version::short(version));

    match github.release_by_tag(&repo, &tag).await {
        Ok(Some(release)) => {
            let notes = release.notes()?;
            Some(ReleaseInfo {
                notes: Some(notes),
                url: Some(release.html_url).filter(|u| !u.is_empty()),
            })
        }
        Ok(None) => None,
        Err(e) => {
            warn!("could not fetch release info for {repo}@{tag}: {e}");
            None
        }
    }
}
