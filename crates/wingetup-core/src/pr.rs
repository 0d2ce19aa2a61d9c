//! Pull requests against upstream through the `gh` CLI.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use wingetup_schema::UPSTREAM_REPO;

use crate::git::commit_message;
use crate::process::{CommandError, Tool};

const GH_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_OWNER: &str = "zeldrisho";
const DEFAULT_REPO_NAME: &str = "winget-pkgs-updater";

#[derive(Error, Debug)]
pub enum PrError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to parse gh output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no GitHub token: pass --token or set GITHUB_TOKEN or GH_TOKEN")]
    MissingToken,
}

/// One row of `gh pr list --json number,title,state`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
}

impl PrSummary {
    fn url(&self) -> String {
        format!("https://github.com/{UPSTREAM_REPO}/pull/{}", self.number)
    }
}

/// First PR that already covers `package_id` at `version`.
///
/// The title must contain the identifier (case-insensitively) and the
/// version. Only open or merged PRs count; closed ones may be retried.
pub fn find_blocking_pr<'a>(
    prs: &'a [PrSummary],
    package_id: &str,
    version: &str,
) -> Option<&'a PrSummary> {
    let id_lower = package_id.to_lowercase();
    prs.iter()
        .filter(|pr| pr.title.to_lowercase().contains(&id_lower) && pr.title.contains(version))
        .find(|pr| {
            let blocking = matches!(pr.state.as_str(), "OPEN" | "MERGED");
            if !blocking {
                info!("found {} PR #{} ({}); will retry", pr.state, pr.number, pr.url());
            }
            blocking
        })
}

/// `gh`, authenticated with `token` when one is given.
fn gh(token: Option<&str>) -> Tool {
    let tool = Tool::new("gh").timeout(GH_TIMEOUT);
    match token.filter(|t| !t.is_empty()) {
        Some(token) => tool.env("GH_TOKEN", token),
        None => tool,
    }
}

/// Whether an open or merged upstream PR already exists for this version.
///
/// A failing `gh` call is logged and treated as "no PR".
pub async fn existing_pr(package_id: &str, version: &str, token: Option<&str>) -> Option<PrSummary> {
    let search = format!("{package_id} {version} in:title");
    info!("checking for existing PRs: {package_id} version {version}");

    let out = gh(token)
        .execute(&[
            "pr", "list", "--repo", UPSTREAM_REPO, "--search", &search, "--state", "all", "--json",
            "number,title,state", "--limit", "10",
        ])
        .await;

    let prs: Vec<PrSummary> = match out {
        Ok(text) if text.trim().is_empty() => Vec::new(),
        Ok(text) => match serde_json::from_str(&text) {
            Ok(prs) => prs,
            Err(e) => {
                warn!("could not parse gh output: {e}");
                return None;
            }
        },
        Err(e) => {
            warn!("could not check existing PRs: {e}; continuing");
            return None;
        }
    };

    let found = find_blocking_pr(&prs, package_id, version).cloned();
    match &found {
        Some(pr) => info!("PR already exists: #{} {} ({}) {}", pr.number, pr.title, pr.state, pr.url()),
        None => info!("no active PR found"),
    }
    found
}

/// Workflow settings as supplied on the command line.
///
/// The CLI fills these from flags or from the GitHub Actions variables of the
/// same meaning; empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// Token for pushing to the fork and calling `gh`
    pub token: Option<String>,
    /// `owner/repo` of the fork, overriding the owner-derived default
    pub fork_repo: Option<String>,
    /// Owner of the repository running the workflow
    pub repository_owner: Option<String>,
    /// `owner/repo` of the repository running the workflow
    pub repository: Option<String>,
    /// Workflow run number
    pub run_number: Option<String>,
    /// Workflow run id
    pub run_id: Option<String>,
}

/// Resolved settings for pushing a branch and opening a PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEnv {
    /// `owner/winget-pkgs` fork to push to
    pub fork_repo: String,
    /// Workflow run number, or `unknown`
    pub run_number: String,
    /// Workflow run id, or `unknown`
    pub run_id: String,
    /// Name of the repository running the workflow
    pub repo_name: String,
    /// Token for git and `gh`
    pub token: String,
}

impl RunEnv {
    /// Fill in defaults for everything but the token.
    ///
    /// # Errors
    ///
    /// Returns an error when no token was supplied.
    pub fn resolve(settings: &RunSettings) -> Result<Self, PrError> {
        let set = |v: &Option<String>| v.clone().filter(|v| !v.is_empty());

        let fork_repo = set(&settings.fork_repo).unwrap_or_else(|| {
            let owner = set(&settings.repository_owner).unwrap_or_else(|| DEFAULT_OWNER.to_string());
            format!("{owner}/winget-pkgs")
        });
        let repo_name = set(&settings.repository)
            .and_then(|r| r.rsplit('/').next().map(ToString::to_string))
            .unwrap_or_else(|| DEFAULT_REPO_NAME.to_string());
        let token = set(&settings.token).ok_or(PrError::MissingToken)?;

        Ok(Self {
            fork_repo,
            run_number: set(&settings.run_number).unwrap_or_else(|| "unknown".to_string()),
            run_id: set(&settings.run_id).unwrap_or_else(|| "unknown".to_string()),
            repo_name,
            token,
        })
    }

    /// Owner half of `fork_repo`.
    pub fn fork_owner(&self) -> &str {
        self.fork_repo.split('/').next().unwrap_or(&self.fork_repo)
    }

    /// PR description linking back to the workflow run.
    pub fn pr_body(&self) -> String {
        let owner = self.fork_owner();
        let repo = &self.repo_name;
        format!(
            "Automated by [{owner}/{repo}](https://github.com/{owner}/{repo}) in workflow run \
             [#{}](https://github.com/{owner}/{repo}/actions/runs/{}).",
            self.run_number, self.run_id
        )
    }
}

/// Open a PR from `fork_owner:branch` against upstream.
///
/// # Errors
///
/// Returns an error if `gh pr create` fails.
pub async fn create_pr(
    env: &RunEnv,
    package_id: &str,
    version: &str,
    branch: &str,
) -> Result<String, PrError> {
    let title = commit_message(package_id, version);
    let head = format!("{}:{branch}", env.fork_owner());
    let body = env.pr_body();
    info!("creating PR: {title}");

    let out = gh(Some(&env.token))
        .execute(&[
            "pr", "create", "--repo", UPSTREAM_REPO, "--title", &title, "--body", &body, "--head",
            &head,
        ])
        .await?;
    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(number: u64, title: &str, state: &str) -> PrSummary {
        PrSummary {
            number,
            title: title.to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn open_or_merged_prs_block() {
        let prs = vec![
            pr(1, "New version: UniKey.UniKey version 4.6.250531", "CLOSED"),
            pr(2, "Update unikey.unikey to 4.6.250531", "MERGED"),
        ];
        assert_eq!(find_blocking_pr(&prs, "UniKey.UniKey", "4.6.250531").map(|p| p.number), Some(2));
    }

    #[test]
    fn closed_or_unrelated_prs_do_not_block() {
        let prs = vec![
            pr(1, "New version: UniKey.UniKey version 4.6.250531", "CLOSED"),
            pr(3, "New version: UniKey.UniKey version 4.6.240101", "OPEN"),
            pr(4, "New version: Other.App version 4.6.250531", "OPEN"),
        ];
        assert!(find_blocking_pr(&prs, "UniKey.UniKey", "4.6.250531").is_none());
    }

    #[test]
    fn parses_gh_json() {
        let prs: Vec<PrSummary> =
            serde_json::from_str(r#"[{"number":7,"title":"New version: A.B version 1.0","state":"OPEN"}]"#).unwrap();
        assert_eq!(prs, vec![pr(7, "New version: A.B version 1.0", "OPEN")]);
    }

    #[test]
    fn run_env_defaults() {
        let settings = RunSettings {
            token: Some("tok".to_string()),
            ..RunSettings::default()
        };
        let env = RunEnv::resolve(&settings).unwrap();
        assert_eq!(env.fork_repo, "zeldrisho/winget-pkgs");
        assert_eq!(env.run_number, "unknown");
        assert_eq!(env.repo_name, "winget-pkgs-updater");
        assert_eq!(env.token, "tok");

        assert!(matches!(
            RunEnv::resolve(&RunSettings::default()),
            Err(PrError::MissingToken)
        ));
        let empty = RunSettings {
            token: Some(String::new()),
            ..RunSettings::default()
        };
        assert!(matches!(RunEnv::resolve(&empty), Err(PrError::MissingToken)));
    }

    #[test]
    fn run_env_from_actions_and_pr_body() {
        let settings = RunSettings {
            token: Some("tok".to_string()),
            repository_owner: Some("alice".to_string()),
            repository: Some("alice/my-updater".to_string()),
            run_number: Some("42".to_string()),
            run_id: Some("987654".to_string()),
            ..RunSettings::default()
        };
        let env = RunEnv::resolve(&settings).unwrap();

        assert_eq!(env.fork_repo, "alice/winget-pkgs");
        assert_eq!(env.fork_owner(), "alice");
        assert_eq!(
            env.pr_body(),
            "Automated by [alice/my-updater](https://github.com/alice/my-updater) in workflow run \
             [#42](https://github.com/alice/my-updater/actions/runs/987654)."
        );

        let settings = RunSettings {
            fork_repo: Some("bob/pkgs".to_string()),
            ..settings
        };
        let env = RunEnv::resolve(&settings).unwrap();
        assert_eq!(env.fork_owner(), "bob");
    }
}
