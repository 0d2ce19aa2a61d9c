//! Version check: discover, build installer URLs, resolve release info.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use wingetup_schema::{CheckverConfig, CheckverError, UPSTREAM_REPO, VersionInfo, version};

use crate::discovery::{self, DiscoveryError};
use crate::github::{Client as GitHubClient, GitHubError};
use crate::io::download::{self, DownloadError};
use crate::template::{self, TemplateError};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] CheckverError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Clients shared by every check in a run.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// GitHub API and raw-content client
    pub github: GitHubClient,
    /// Client for vendor pages and installer downloads
    pub http: reqwest::Client,
}

impl CheckContext {
    /// Clients for one run; `token` authenticates GitHub API calls.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn new(token: Option<String>) -> Result<Self, CheckError> {
        Ok(Self {
            github: GitHubClient::new(token)?,
            http: download::client()?,
        })
    }
}

/// Result of checking one package.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// Discovery ran but produced no version.
    NotFound,
    /// Upstream already has this version (or a newer one).
    UpToDate {
        /// Latest version in the upstream repository
        published: String,
    },
    /// A version upstream does not have yet.
    Available {
        /// Latest version in the upstream repository, if any
        published: Option<String>,
        /// Everything `update` needs
        info: Box<VersionInfo>,
    },
}

impl CheckOutcome {
    pub fn into_update(self) -> Option<VersionInfo> {
        match self {
            Self::Available { info, .. } => Some(*info),
            _ => None,
        }
    }
}

/// Version directories published upstream for this package.
///
/// # Errors
///
/// Returns an error if the directory listing fails.
pub async fn published_versions(
    github: &GitHubClient,
    config: &CheckverConfig,
) -> Result<Vec<String>, GitHubError> {
    let entries = github
        .list_dir(UPSTREAM_REPO, &config.manifest_dir(), None)
        .await?;
    Ok(entries
        .into_iter()
        .filter(|e| e.is_dir())
        .map(|e| e.name)
        .collect())
}

/// Check one package for a new version.
///
/// # Errors
///
/// Returns an error on misconfiguration, a discovery failure, or an
/// installer URL template that cannot be rendered. An unreachable installer
/// URL or an unavailable upstream listing only logs a warning.
pub async fn check_package(
    ctx: &CheckContext,
    config: &CheckverConfig,
) -> Result<CheckOutcome, CheckError> {
    let id = config.id()?.clone();
    info!("checking {id}");

    let source = discovery::source_for(config, &ctx.github)?;
    let Some(found) = source.discover().await? else {
        warn!("{id}: could not determine latest version");
        return Ok(CheckOutcome::NotFound);
    };
    info!("{id}: latest version {}", found.version);

    let published = match published_versions(&ctx.github, config).await {
        Ok(versions) => version::latest(&versions).map(ToString::to_string),
        Err(e) => {
            warn!("{id}: could not list upstream versions: {e}");
            None
        }
    };
    if let Some(p) = &published {
        if !version::is_newer(p, &found.version) {
            info!("{id}: up to date ({p})");
            return Ok(CheckOutcome::UpToDate { published: p.clone() });
        }
    }

    let urls = template::installer_urls(config, &found.version, &found.metadata)?;
    for (arch, url) in urls.iter() {
        let label = arch.map_or("installer", |a| a.as_str());
        if download::url_exists(&ctx.http, url).await {
            debug!("{label} url ok: {url}");
        } else {
            warn!("{label} url not reachable yet: {url}");
        }
    }

    let mut release = template::release_info(config, &found.version, &found.metadata)?;
    if release.is_empty() {
        if let Some(info) = discovery::script_release_info(config, &found.version, &ctx.github).await {
            release = info;
        }
    }

    let info = VersionInfo {
        package_identifier: id,
        version: found.version,
        installer_url: urls.primary().to_string(),
        installer_urls: urls.per_arch().cloned(),
        release_notes: release.notes,
        release_notes_url: release.url,
        metadata: found.metadata,
        checkver_config: config.clone(),
    };

    Ok(CheckOutcome::Available {
        published,
        info: Box::new(info),
    })
}

/// Append GitHub Actions step outputs for a check result.
///
/// # Errors
///
/// Returns an error if the output file cannot be opened or written.
pub fn write_github_output(path: &Path, info: Option<&VersionInfo>) -> Result<(), CheckError> {
    let io_err = |source| CheckError::Output {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;

    let text = match info {
        Some(info) => format!(
            "has_update=true\nversion={}\npackage_id={}\ninstaller_url={}\n",
            info.version, info.package_identifier, info.installer_url
        ),
        None => "has_update=false\n".to_string(),
    };
    file.write_all(text.as_bytes()).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::tempdir;

    fn context(server: &Server) -> CheckContext {
        CheckContext {
            github: GitHubClient::new(None)
                .unwrap()
                .with_bases(server.url(), server.url()),
            http: download::client().unwrap(),
        }
    }

    fn config(server: &Server) -> CheckverConfig {
        let yaml = format!(
            "\
packageIdentifier: Contoso.App
checkver:
  type: github
  repo: contoso/app
installerUrlTemplate:
  x64: {url}/v{{version}}/app-x64.zip
  arm64: {url}/v{{version}}/app-arm64.zip
updateMetadata:
  - ReleaseNotes
  - ReleaseNotesUrl
",
            url = server.url()
        );
        CheckverConfig::parse(&yaml, None).unwrap()
    }

    async fn mock_release(server: &mut Server) {
        server
            .mock("GET", "/repos/contoso/app/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name":"v1.3.0","body":"  Bug fixes  ","html_url":"https://github.com/contoso/app/releases/v1.3.0"}"#)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn reports_new_version_with_urls_and_notes() {
        let mut server = Server::new_async().await;
        mock_release(&mut server).await;
        server
            .mock("GET", "/repos/microsoft/winget-pkgs/contents/manifests/c/Contoso/App")
            .with_status(200)
            .with_body(r#"[{"name":"1.2.0","type":"dir"},{"name":"1.10.0-rc","type":"file"}]"#)
            .create_async()
            .await;
        server.mock("HEAD", "/v1.3.0/app-x64.zip").with_status(200).create_async().await;
        server.mock("HEAD", "/v1.3.0/app-arm64.zip").with_status(404).create_async().await;

        let outcome = check_package(&context(&server), &config(&server)).await.unwrap();
        let CheckOutcome::Available { published, info } = outcome else {
            panic!("expected update, got {outcome:?}");
        };

        assert_eq!(published.as_deref(), Some("1.2.0"));
        assert_eq!(info.version, "1.3.0");
        assert_eq!(info.installer_url, format!("{}/v1.3.0/app-x64.zip", server.url()));
        assert_eq!(info.installer_urls.as_ref().map(std::collections::BTreeMap::len), Some(2));
        assert_eq!(info.release_notes.as_deref(), Some("Bug fixes"));
        assert_eq!(
            info.release_notes_url.as_deref(),
            Some("https://github.com/contoso/app/releases/v1.3.0")
        );
    }

    #[tokio::test]
    async fn published_version_is_up_to_date() {
        let mut server = Server::new_async().await;
        mock_release(&mut server).await;
        server
            .mock("GET", "/repos/microsoft/winget-pkgs/contents/manifests/c/Contoso/App")
            .with_status(200)
            .with_body(r#"[{"name":"1.2.0","type":"dir"},{"name":"1.3.0","type":"dir"}]"#)
            .create_async()
            .await;

        let outcome = check_package(&context(&server), &config(&server)).await.unwrap();
        assert!(matches!(outcome, CheckOutcome::UpToDate { ref published } if published == "1.3.0"));
        assert!(outcome.into_update().is_none());
    }

    #[tokio::test]
    async fn missing_release_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/contoso/app/releases/latest")
            .with_status(404)
            .create_async()
            .await;

        let outcome = check_package(&context(&server), &config(&server)).await.unwrap();
        assert!(matches!(outcome, CheckOutcome::NotFound));
    }

    #[tokio::test]
    async fn config_without_url_template_is_an_error() {
        let mut server = Server::new_async().await;
        mock_release(&mut server).await;
        server
            .mock("GET", "/repos/microsoft/winget-pkgs/contents/manifests/c/Contoso/App")
            .with_status(404)
            .create_async()
            .await;

        let cfg = CheckverConfig::parse(
            "packageIdentifier: Contoso.App\ncheckver:\n  type: github\n  repo: contoso/app\n",
            None,
        )
        .unwrap();
        let err = check_package(&context(&server), &cfg).await.unwrap_err();
        assert!(matches!(err, CheckError::Template(TemplateError::Missing)));
    }

    #[test]
    fn appends_github_outputs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "existing=1\n").unwrap();

        write_github_output(&path, None).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing=1\nhas_update=false\n");

        let info: VersionInfo = serde_json::from_str(
            r#"{"packageIdentifier":"Contoso.App","version":"1.3.0","installerUrl":"https://x/app.msi",
                "checkver_config":{"packageIdentifier":"Contoso.App"}}"#,
        )
        .unwrap();
        write_github_output(&path, Some(&info)).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().ends_with(
            "has_update=true\nversion=1.3.0\npackage_id=Contoso.App\ninstaller_url=https://x/app.msi\n"
        ));
    }
}
