//! wingetup - WinGet manifest auto-updater
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Watches upstream releases of Windows packages and keeps their manifests
//! in `microsoft/winget-pkgs` current.
//!
//! # Workflow
//!
//! ```text
//! checkver.yaml ──check──▶ version.json ──update──▶ fork branch ──▶ upstream PR
//! ```
//!
//! `check` discovers the latest version and renders installer URLs; `update`
//! clones the fork, copies the newest published manifests, rewrites them for
//! the new release and opens a pull request.
//!
//! Tokens and workflow details come from flags or, under GitHub Actions,
//! from the matching environment variables (`GITHUB_TOKEN`, `GH_TOKEN`,
//! `WINGET_FORK_REPO`, `GITHUB_REPOSITORY_OWNER`, `GITHUB_REPOSITORY`,
//! `GITHUB_RUN_NUMBER`, `GITHUB_RUN_ID`, `GITHUB_OUTPUT`).

pub mod cmd;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wingetup_core::pr::RunSettings;

/// Default output directory for `generate`.
pub fn default_generate_dir() -> PathBuf {
    std::env::temp_dir().join("winget-manifests")
}

/// GitHub credentials.
#[derive(Debug, Clone, Default, Args)]
pub struct GitHubArgs {
    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// GitHub token, used when --token is not given
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub gh_token: Option<String>,
}

impl GitHubArgs {
    /// The first non-empty token.
    pub fn resolved_token(&self) -> Option<String> {
        [&self.token, &self.gh_token]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .cloned()
    }
}

/// Fork and workflow run details for `update`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub github: GitHubArgs,
    /// Fork to push to [default: <owner>/winget-pkgs]
    #[arg(long, value_name = "OWNER/REPO", env = "WINGET_FORK_REPO")]
    pub fork_repo: Option<String>,
    /// Owner of the repository running the workflow
    #[arg(long, value_name = "OWNER", env = "GITHUB_REPOSITORY_OWNER")]
    pub repository_owner: Option<String>,
    /// Repository running the workflow, linked from the PR body
    #[arg(long, value_name = "OWNER/REPO", env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,
    /// Workflow run number
    #[arg(long, env = "GITHUB_RUN_NUMBER")]
    pub run_number: Option<String>,
    /// Workflow run id
    #[arg(long, env = "GITHUB_RUN_ID")]
    pub run_id: Option<String>,
}

impl RunArgs {
    /// Settings for the update pipeline.
    pub fn settings(&self) -> RunSettings {
        RunSettings {
            token: self.github.resolved_token(),
            fork_repo: self.fork_repo.clone(),
            repository_owner: self.repository_owner.clone(),
            repository: self.repository.clone(),
            run_number: self.run_number.clone(),
            run_id: self.run_id.clone(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "wingetup")]
#[command(author, version, about = "Keep WinGet manifests up to date", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check a package (or every package below a directory) for a new version
    Check {
        /// Checkver file
        #[arg(required_unless_present = "all")]
        checkver: Option<PathBuf>,
        /// Check every *.checkver.yaml below this directory
        #[arg(long, value_name = "DIR", conflicts_with = "checkver")]
        all: Option<PathBuf>,
        /// Write the version info JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// GitHub Actions step output file
        #[arg(long, env = "GITHUB_OUTPUT", hide_env_values = true)]
        github_output: Option<PathBuf>,
        #[command(flatten)]
        github: GitHubArgs,
    },
    /// Update manifests for a detected version and open a PR
    Update {
        /// Checkver file of the package
        checkver: PathBuf,
        /// Version info JSON written by `check`
        version_info: PathBuf,
        /// Push the branch without checking for or creating a PR
        #[arg(long)]
        no_pr: bool,
        /// Update an existing winget-pkgs checkout instead of cloning the fork
        #[arg(long, value_name = "DIR")]
        fork_path: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Generate a fresh manifest set from a legacy package config
    Generate {
        /// Package config
        config: PathBuf,
        /// Package version
        version: String,
        /// Installer download URL
        installer_url: String,
        /// Root directory for the manifests
        #[arg(default_value_os_t = default_generate_dir())]
        output_dir: PathBuf,
        /// GitHub Actions step output file
        #[arg(long, env = "GITHUB_OUTPUT", hide_env_values = true)]
        github_output: Option<PathBuf>,
    },
    /// Add missing architectures to the latest published installer manifest
    AddArch {
        /// Checkver file with per-architecture installer URLs
        checkver: PathBuf,
        /// Output file [default: <PackageId>.installer.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        github: GitHubArgs,
    },
    /// Create a package config interactively
    New {
        /// Directory to save the config in
        #[arg(long, default_value = "manifests")]
        dir: PathBuf,
    },
    /// Compute the InstallerSha256 of local files
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_requires_a_target() {
        assert!(Cli::try_parse_from(["wingetup", "check"]).is_err());
        assert!(Cli::try_parse_from(["wingetup", "check", "a.checkver.yaml", "--all", "pkgs"]).is_err());

        let cli = Cli::try_parse_from(["wingetup", "check", "--all", "pkgs"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { all: Some(_), checkver: None, .. }));
    }

    #[test]
    fn update_settings_come_from_flags() {
        let cli = Cli::try_parse_from([
            "wingetup",
            "update",
            "a.checkver.yaml",
            "version.json",
            "--token",
            "tok",
            "--fork-repo",
            "bob/pkgs",
            "--repository",
            "alice/my-updater",
            "--run-number",
            "42",
            "--run-id",
            "987654",
        ])
        .unwrap();
        let Commands::Update { run, .. } = cli.command else {
            panic!("expected update");
        };

        let settings = run.settings();
        assert_eq!(settings.token.as_deref(), Some("tok"));
        assert_eq!(settings.fork_repo.as_deref(), Some("bob/pkgs"));
        assert_eq!(settings.repository.as_deref(), Some("alice/my-updater"));
        assert_eq!(settings.run_number.as_deref(), Some("42"));
        assert_eq!(settings.run_id.as_deref(), Some("987654"));
    }

    #[test]
    fn gh_token_backs_up_an_empty_token() {
        let github = GitHubArgs {
            token: Some(String::new()),
            gh_token: Some("gh".to_string()),
        };
        assert_eq!(github.resolved_token().as_deref(), Some("gh"));
        assert_eq!(GitHubArgs::default().resolved_token(), None);
    }

    #[test]
    fn generate_defaults_output_dir() {
        let cli = Cli::try_parse_from(["wingetup", "generate", "c.yaml", "1.0", "https://x/app.msi"]).unwrap();
        let Commands::Generate { output_dir, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(output_dir, default_generate_dir());
    }
}
