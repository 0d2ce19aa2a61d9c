//! Git operations on a clone of the user's winget-pkgs fork.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use wingetup_schema::{UPSTREAM_BRANCH, UPSTREAM_REPO};

use crate::process::{CommandError, Tool};

pub const BOT_NAME: &str = "github-actions[bot]";
pub const BOT_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";

const CLONE_DEPTH: &str = "50";
const NETWORK_TIMEOUT: Duration = Duration::from_secs(600);
const LOCAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Commit and PR title for a new package version.
pub fn commit_message(package_id: &str, version: &str) -> String {
    format!("New version: {package_id} version {version}")
}

/// `https://github.com/<repo>.git`, with the token as userinfo when given.
pub fn github_url(repo: &str, token: Option<&str>) -> String {
    match token {
        Some(t) => format!("https://{t}@github.com/{repo}.git"),
        None => format!("https://github.com/{repo}.git"),
    }
}

/// Rewrite an SSH GitHub remote to a token HTTPS URL.
///
/// Returns `None` for remotes that need no rewrite.
pub fn token_remote(remote: &str, token: &str) -> Option<String> {
    let path = remote.strip_prefix("git@github.com:")?;
    let path = path.strip_suffix(".git").unwrap_or(path);
    Some(github_url(path, Some(token)))
}

/// A local checkout.
#[derive(Debug, Clone)]
pub struct Repo {
    dir: PathBuf,
}

impl Repo {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn git(&self, timeout: Duration) -> Tool {
        Tool::new("git").current_dir(&self.dir).timeout(timeout)
    }

    /// Shallow-clone `url` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if `git clone` fails.
    pub async fn clone_url(url: &str, dest: &Path) -> Result<Self, CommandError> {
        let dest_str = dest.to_string_lossy();
        Tool::new("git")
            .timeout(NETWORK_TIMEOUT)
            .execute(&["clone", "--depth", CLONE_DEPTH, url, &dest_str])
            .await?;
        Ok(Self::open(dest))
    }

    /// Clone the fork, bring it up to date with upstream and set the bot
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns an error if cloning, fetching or configuring fails.
    pub async fn clone_fork(fork: &str, dest: &Path, token: &str) -> Result<Self, CommandError> {
        info!("cloning {}", github_url(fork, None));
        let repo = Self::clone_url(&github_url(fork, Some(token)), dest).await?;

        info!("syncing with upstream {UPSTREAM_REPO}");
        repo.sync_upstream(&github_url(UPSTREAM_REPO, None), UPSTREAM_BRANCH)
            .await?;
        repo.configure_identity(BOT_NAME, BOT_EMAIL).await?;
        Ok(repo)
    }

    /// Add `upstream`, fetch `branch` and merge it preferring upstream
    /// changes; a failed merge falls back to a hard reset.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cannot be added or fetched, or the
    /// fallback reset fails.
    pub async fn sync_upstream(&self, url: &str, branch: &str) -> Result<(), CommandError> {
        self.git(LOCAL_TIMEOUT)
            .execute(&["remote", "add", "upstream", url])
            .await?;
        self.git(NETWORK_TIMEOUT)
            .execute(&["fetch", "upstream", branch, "--depth", CLONE_DEPTH])
            .await?;

        let target = format!("upstream/{branch}");
        let merge = self
            .git(LOCAL_TIMEOUT)
            .execute(&["merge", &target, "--no-edit", "--strategy-option", "theirs"])
            .await;

        match merge {
            Ok(_) => info!("synced with {target}"),
            Err(e) => {
                warn!("merge failed ({e}); resetting to {target}");
                self.git(LOCAL_TIMEOUT)
                    .execute(&["reset", "--hard", &target])
                    .await?;
            }
        }
        Ok(())
    }

    /// Set the commit identity for this checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if `git config` fails.
    pub async fn configure_identity(&self, name: &str, email: &str) -> Result<(), CommandError> {
        let git = self.git(LOCAL_TIMEOUT);
        git.execute(&["config", "user.name", name]).await?;
        git.execute(&["config", "user.email", email]).await?;
        Ok(())
    }

    /// Create and check out `branch`.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch exists or cannot be created.
    pub async fn create_branch(&self, branch: &str) -> Result<(), CommandError> {
        self.git(LOCAL_TIMEOUT)
            .execute(&["checkout", "-b", branch])
            .await?;
        info!("created branch {branch}");
        Ok(())
    }

    /// Stage everything and commit.
    ///
    /// # Errors
    ///
    /// Returns an error if staging or committing fails (including nothing to
    /// commit).
    pub async fn commit_all(&self, message: &str) -> Result<(), CommandError> {
        let git = self.git(LOCAL_TIMEOUT);
        git.execute(&["add", "."]).await?;
        git.execute(&["commit", "-m", message]).await?;
        Ok(())
    }

    /// Subject line of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns an error if `git log` fails.
    pub async fn head_subject(&self) -> Result<String, CommandError> {
        let out = self
            .git(LOCAL_TIMEOUT)
            .execute(&["log", "-1", "--format=%s"])
            .await?;
        Ok(out.trim().to_string())
    }

    /// Push `branch` to `origin`, switching an SSH origin to token HTTPS first.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cannot be read or rewritten, or the push
    /// fails.
    pub async fn push(&self, branch: &str, token: &str) -> Result<(), CommandError> {
        let origin = self
            .git(LOCAL_TIMEOUT)
            .execute(&["remote", "get-url", "origin"])
            .await?;

        if let Some(url) = token_remote(origin.trim(), token) {
            self.git(LOCAL_TIMEOUT)
                .execute(&["remote", "set-url", "origin", &url])
                .await?;
        }

        self.git(NETWORK_TIMEOUT)
            .execute(&["push", "origin", branch])
            .await?;
        info!("pushed {branch}");
        Ok(())
    }
}
