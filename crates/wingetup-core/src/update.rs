//! The update pipeline: hash installers, copy the newest manifest set into a
//! new version directory, rewrite it, and hand it to git and `gh`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};
use wingetup_schema::{Arch, CheckverError, InstallerSha256, PackageId, UPSTREAM_REPO, VersionInfo, version};

use crate::git::{Repo, commit_message};
use crate::github::{Client as GitHubClient, GitHubError};
use crate::io::download::{self, DownloadError};
use crate::io::{InstallerKind, msi, msix};
use crate::manifest::{self, ManifestError, ManifestUpdate, ProductCodes};
use crate::pr::{self, PrError, PrSummary, RunEnv, RunSettings};
use crate::process::CommandError;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    Config(#[from] CheckverError),

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Failed to hash any installer")]
    NoInstallers,

    #[error("Version directory already exists: {0}")]
    VersionExists(PathBuf),

    #[error("No existing versions under {0} and no templateCommit/templateVersion to fall back on")]
    NoTemplate(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Pr(#[from] PrError),
}

impl UpdateError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Everything the pipeline needs from a check result.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub package_id: PackageId,
    pub version: String,
    /// `manifests/<p>/<Publisher>/<Package>`
    pub manifest_dir: String,
    pub installer_url: String,
    pub installer_urls: Option<BTreeMap<Arch, String>>,
    pub release_notes: Option<String>,
    pub release_notes_url: Option<String>,
    pub template_commit: Option<String>,
    pub template_version: Option<String>,
}

impl UpdateRequest {
    pub fn from_info(info: &VersionInfo) -> Self {
        let config = &info.checkver_config;
        let manifest_dir = Some(config.manifest_dir())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| info.package_identifier.manifest_path());

        Self {
            package_id: info.package_identifier.clone(),
            version: info.version.clone(),
            manifest_dir,
            installer_url: info.installer_url.clone(),
            installer_urls: info.installer_urls.clone().filter(|u| !u.is_empty()),
            release_notes: info.release_notes.clone(),
            release_notes_url: info.release_notes_url.clone(),
            template_commit: config.template_commit.clone(),
            template_version: config.template_version.clone(),
        }
    }
}

/// Digests and installer metadata for one release.
#[derive(Debug, Clone, Default)]
pub struct InstallerDigests {
    pub single: Option<InstallerSha256>,
    pub by_arch: BTreeMap<Arch, InstallerSha256>,
    pub signature: Option<InstallerSha256>,
    pub product_codes: ProductCodes,
}

/// Download and hash every installer of the request.
///
/// Per-architecture downloads that fail are skipped; a single installer that
/// fails is an error.
///
/// # Errors
///
/// Returns an error when no installer could be hashed.
pub async fn hash_installers(
    http: &reqwest::Client,
    request: &UpdateRequest,
) -> Result<InstallerDigests, UpdateError> {
    let mut digests = InstallerDigests::default();

    if let Some(urls) = &request.installer_urls {
        info!(
            "multi-architecture package: {}",
            urls.keys().map(Arch::as_str).collect::<Vec<_>>().join(", ")
        );
        for (arch, url) in urls {
            let kind = InstallerKind::from_url(url);
            let tmp = temp_installer(kind)?;
            match download::download_to(http, url, tmp.path()).await {
                Ok(downloaded) => {
                    info!("{arch} InstallerSha256: {}", downloaded.sha256);
                    digests.by_arch.insert(*arch, downloaded.sha256);
                    if kind == InstallerKind::Msi {
                        if let Some(code) = msi::product_code(tmp.path()).await {
                            digests.product_codes.by_arch.insert(*arch, code);
                        }
                    }
                }
                Err(e) => warn!("failed to download {arch} installer: {e}"),
            }
        }
        if digests.by_arch.is_empty() {
            return Err(UpdateError::NoInstallers);
        }
        return Ok(digests);
    }

    let kind = InstallerKind::from_url(&request.installer_url);
    let tmp = temp_installer(kind)?;
    let downloaded = download::download_to(http, &request.installer_url, tmp.path()).await?;
    info!("InstallerSha256: {}", downloaded.sha256);
    digests.single = Some(downloaded.sha256);

    match kind {
        InstallerKind::Msix => digests.signature = msix::signature_sha256(tmp.path()).await,
        InstallerKind::Msi => digests.product_codes.default = msi::product_code(tmp.path()).await,
        InstallerKind::Zip | InstallerKind::Exe => {}
    }
    Ok(digests)
}

fn temp_installer(kind: InstallerKind) -> Result<tempfile::NamedTempFile, UpdateError> {
    tempfile::Builder::new()
        .prefix("wingetup-")
        .suffix(kind.suffix())
        .tempfile()
        .map_err(UpdateError::io(std::env::temp_dir()))
}

/// Version directories present under `base`; a missing `base` has none.
fn local_versions(base: &Path) -> Result<Vec<String>, UpdateError> {
    let entries = match std::fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(UpdateError::io(base)(e)),
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(UpdateError::io(base))?;
        if entry.path().is_dir() {
            versions.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(versions)
}

/// The manifest set a new version is derived from.
#[derive(Debug)]
struct TemplateSet {
    dir: PathBuf,
    version: String,
    // Keeps fetched templates alive (and out of the repository).
    _temp: Option<TempDir>,
}

async fn select_template(
    repo_dir: &Path,
    request: &UpdateRequest,
    github: &GitHubClient,
) -> Result<TemplateSet, UpdateError> {
    let base = repo_dir.join(&request.manifest_dir);
    let versions = local_versions(&base)?;

    if let Some(latest) = versions.iter().max_by_key(|v| version::sort_key(v)) {
        let mut recent: Vec<&String> = versions.iter().collect();
        recent.sort_by_key(|v| version::sort_key(v));
        let tail: Vec<&str> = recent.iter().rev().take(5).rev().map(|v| v.as_str()).collect();
        info!("available versions: {}", tail.join(", "));
        info!("using {latest} as template");

        if version::sort_key(latest) >= version::sort_key(&request.version) {
            warn!(
                "latest version {latest} >= target version {}; the version may already exist",
                request.version
            );
        }
        return Ok(TemplateSet {
            dir: base.join(latest),
            version: latest.clone(),
            _temp: None,
        });
    }

    let (Some(commit), Some(template_version)) = (&request.template_commit, &request.template_version) else {
        return Err(UpdateError::NoTemplate(request.manifest_dir.clone()));
    };
    info!("no existing versions; using {template_version} from commit {commit}");
    fetch_template(github, &request.manifest_dir, commit, template_version).await
}

async fn fetch_template(
    github: &GitHubClient,
    manifest_dir: &str,
    commit: &str,
    template_version: &str,
) -> Result<TemplateSet, UpdateError> {
    let temp = tempfile::tempdir().map_err(UpdateError::io(std::env::temp_dir()))?;
    let dir = temp.path().join(template_version);
    std::fs::create_dir_all(&dir).map_err(UpdateError::io(&dir))?;

    let remote_dir = format!("{manifest_dir}/{template_version}");
    let entries = github.list_dir(UPSTREAM_REPO, &remote_dir, Some(commit)).await?;

    let mut fetched = 0;
    for entry in entries.iter().filter(|e| e.name.ends_with(".yaml")) {
        let path = format!("{remote_dir}/{}", entry.name);
        if let Some(content) = github.raw_file(UPSTREAM_REPO, commit, &path).await? {
            let dest = dir.join(&entry.name);
            std::fs::write(&dest, content).map_err(UpdateError::io(&dest))?;
            info!("downloaded template {}", entry.name);
            fetched += 1;
        }
    }

    if fetched == 0 {
        return Err(UpdateError::NoTemplate(remote_dir));
    }
    Ok(TemplateSet {
        dir,
        version: template_version.to_string(),
        _temp: Some(temp),
    })
}

/// Manifests written for a new version.
#[derive(Debug, Clone)]
pub struct UpdatedManifests {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Create `<manifest_dir>/<version>` from the newest existing version (or
/// the configured upstream template) using precomputed digests.
///
/// # Errors
///
/// Returns an error if the version already exists, no template is
/// available, or a file cannot be read or written.
pub async fn write_version(
    repo_dir: &Path,
    request: &UpdateRequest,
    digests: &InstallerDigests,
    github: &GitHubClient,
) -> Result<UpdatedManifests, UpdateError> {
    let version_dir = repo_dir.join(&request.manifest_dir).join(&request.version);
    if version_dir.exists() {
        return Err(UpdateError::VersionExists(version_dir));
    }

    let template = select_template(repo_dir, request, github).await?;
    info!("copying from {}", template.version);

    let mut names: Vec<String> = std::fs::read_dir(&template.dir)
        .map_err(UpdateError::io(&template.dir))?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".yaml"))
        .collect();
    names.sort();

    let mut base = ManifestUpdate::new(&request.version);
    base.signature_sha256.clone_from(&digests.signature);
    base.product_codes = digests.product_codes.clone();
    match &request.installer_urls {
        Some(urls) if !digests.by_arch.is_empty() => {
            // Only architectures whose installer was hashed get a new URL.
            base.arch_urls = urls
                .iter()
                .filter(|(arch, _)| digests.by_arch.contains_key(*arch))
                .map(|(arch, url)| (*arch, url.clone()))
                .collect();
            base.arch_hashes = digests.by_arch.clone();
        }
        _ => {
            base.installer_url = Some(request.installer_url.clone());
            base.installer_sha256.clone_from(&digests.single);
        }
    }

    std::fs::create_dir_all(&version_dir).map_err(UpdateError::io(&version_dir))?;

    let mut files = Vec::new();
    for name in names {
        let src = template.dir.join(&name);
        let content = std::fs::read_to_string(&src).map_err(UpdateError::io(&src))?;

        let updated = if name.contains(".locale.") {
            let mut update = base.clone();
            update.release_notes.clone_from(&request.release_notes);
            update.release_notes_url.clone_from(&request.release_notes_url);
            manifest::update_content(&content, &update)
        } else if name.contains(".installer.") && !base.arch_hashes.is_empty() {
            let updated = manifest::update_content(&content, &base);
            manifest::add_missing_architectures(&updated, &base.arch_hashes, &base.arch_urls)
        } else {
            manifest::update_content(&content, &base)
        };

        let dest = version_dir.join(&name);
        std::fs::write(&dest, &updated).map_err(UpdateError::io(&dest))?;
        info!("updated {name}");

        match manifest::validate(&updated) {
            Ok(warnings) => {
                for w in warnings {
                    warn!("{name}: {w}");
                }
            }
            Err(e) => warn!("{name} may have validation issues: {e}"),
        }
        files.push(dest);
    }

    Ok(UpdatedManifests {
        dir: version_dir,
        files,
    })
}

/// Hash installers and write the new version directory into `repo_dir`.
///
/// # Errors
///
/// See [`hash_installers`] and [`write_version`].
pub async fn update_manifests(
    repo_dir: &Path,
    request: &UpdateRequest,
    http: &reqwest::Client,
    github: &GitHubClient,
) -> Result<UpdatedManifests, UpdateError> {
    info!("updating {} to {}", request.package_id, request.version);
    let version_dir = repo_dir.join(&request.manifest_dir).join(&request.version);
    if version_dir.exists() {
        return Err(UpdateError::VersionExists(version_dir));
    }

    let digests = hash_installers(http, request).await?;
    write_version(repo_dir, request, &digests, github).await
}

/// Options for [`run_update`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip the existing-PR check and PR creation.
    pub no_pr: bool,
    /// Update this checkout in place instead of cloning the fork.
    pub fork_path: Option<PathBuf>,
    /// Token, fork and workflow run details.
    pub settings: RunSettings,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// An open or merged PR already covers this version.
    Skipped(PrSummary),
    /// Manifests were written to an existing checkout.
    Updated(UpdatedManifests),
    /// The branch was pushed without opening a PR.
    Pushed {
        /// Branch on the fork
        branch: String,
    },
    /// The branch was pushed and a PR opened.
    PrCreated {
        /// Branch on the fork
        branch: String,
        /// URL printed by `gh pr create`
        url: String,
    },
}

/// The full update: PR pre-check, clone, branch, write, commit, push, PR.
///
/// # Errors
///
/// Returns an error if any step after the pre-check fails.
pub async fn run_update(info: &VersionInfo, options: &RunOptions) -> Result<RunOutcome, UpdateError> {
    let request = UpdateRequest::from_info(info);
    let id = request.package_id.as_str();

    if !options.no_pr {
        let token = options.settings.token.as_deref();
        if let Some(existing) = pr::existing_pr(id, &request.version, token).await {
            return Ok(RunOutcome::Skipped(existing));
        }
    }

    let env = RunEnv::resolve(&options.settings)?;
    let http = download::client()?;
    let github = GitHubClient::new(Some(env.token.clone()))?;

    if let Some(path) = &options.fork_path {
        info!("using existing checkout at {}", path.display());
        let updated = update_manifests(path, &request, &http, &github).await?;
        return Ok(RunOutcome::Updated(updated));
    }

    let workspace = tempfile::tempdir().map_err(UpdateError::io(std::env::temp_dir()))?;
    let repo = Repo::clone_fork(&env.fork_repo, &workspace.path().join("winget-pkgs"), &env.token).await?;

    let branch = request.package_id.branch_name(&request.version);
    repo.create_branch(&branch).await?;
    update_manifests(repo.dir(), &request, &http, &github).await?;
    repo.commit_all(&commit_message(id, &request.version)).await?;
    repo.push(&branch, &env.token).await?;

    if options.no_pr {
        return Ok(RunOutcome::Pushed { branch });
    }
    let url = pr::create_pr(&env, id, &request.version, &branch).await?;
    Ok(RunOutcome::PrCreated { branch, url })
}
