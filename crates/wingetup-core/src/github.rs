//! GitHub REST API and raw content access.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Failures talking to GitHub.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// Transport failure or undecodable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An unexpected status code.
    #[error("GitHub returned {status} for {url}")]
    Status {
        /// Status received
        status: StatusCode,
        /// Requested URL
        url: String,
    },
}

/// A GitHub release as returned by the releases API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Tag the release was cut from
    pub tag_name: String,
    /// Markdown release notes
    #[serde(default)]
    pub body: Option<String>,
    /// Release page
    #[serde(default)]
    pub html_url: String,
}

impl Release {
    /// Release body with surrounding whitespace removed; `None` when empty.
    pub fn notes(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(ToString::to_string)
    }
}

/// One entry of a repository directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    /// File or directory name
    pub name: String,
    /// `file`, `dir`, `symlink` or `submodule`
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContentEntry {
    /// Whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == "dir"
    }
}

/// Thin GitHub client. Base URLs are overridable so tests can point it at a
/// local mock server.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_base: String,
    raw_base: String,
    token: Option<String>,
}

impl Client {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(token: Option<String>) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: API_BASE.to_string(),
            raw_base: RAW_BASE.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Point the client at other API and raw-content hosts.
    pub fn with_bases(mut self, api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.raw_base = raw_base.into().trim_end_matches('/').to_string();
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        debug!("GET {url}");
        let req = self.http.get(url);
        match &self.token {
            Some(token) => req.header(reqwest::header::AUTHORIZATION, format!("token {token}")),
            None => req,
        }
    }

    async fn release(&self, url: String) -> Result<Option<Release>, GitHubError> {
        let resp = self.get(&url).send().await?;
        if resp.status() != StatusCode::OK {
            warn!("GitHub API returned {} for {url}", resp.status());
            return Ok(None);
        }
        Ok(Some(resp.json::<Release>().await?))
    }

    /// Latest published release of `owner/repo`; `None` for any non-200 reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or an undecodable body.
    pub async fn latest_release(&self, repo: &str) -> Result<Option<Release>, GitHubError> {
        self.release(format!("{}/repos/{repo}/releases/latest", self.api_base))
            .await
    }

    /// Release of `owner/repo` with tag `tag`; `None` for any non-200 reply.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or an undecodable body.
    pub async fn release_by_tag(
        &self,
        repo: &str,
        tag: &str,
    ) -> Result<Option<Release>, GitHubError> {
        self.release(format!("{}/repos/{repo}/releases/tags/{tag}", self.api_base))
            .await
    }

    /// List a repository directory, optionally at a specific ref.
    ///
    /// A missing directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or other non-success replies.
    pub async fn list_dir(
        &self,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Vec<ContentEntry>, GitHubError> {
        let mut url = format!("{}/repos/{repo}/contents/{path}", self.api_base);
        if let Some(r) = git_ref {
            url.push_str("?ref=");
            url.push_str(r);
        }

        let resp = self.get(&url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => Ok(resp.json().await?),
            status => Err(GitHubError::Status { status, url }),
        }
    }

    /// Raw file contents at `git_ref`; `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or other non-success replies.
    pub async fn raw_file(
        &self,
        repo: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<Option<String>, GitHubError> {
        let url = format!("{}/{repo}/{git_ref}/{path}", self.raw_base);
        let resp = self.get(&url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.text().await?)),
            status => Err(GitHubError::Status { status, url }),
        }
    }
}
