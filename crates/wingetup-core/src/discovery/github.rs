//! Version discovery from GitHub releases.

use async_trait::async_trait;
use tracing::{info, warn};
use wingetup_schema::version;

use super::{Discovered, DiscoveryError, VersionSource};
use crate::github::Client;

/// Latest GitHub release of a repository.
///
/// A non-200 reply (no releases, rate limited, unknown repository) means
/// "nothing found" and yields `Ok(None)`. Transport failures and undecodable
/// bodies surface as [`DiscoveryError`] instead, so a network outage fails
/// the check of this one package rather than reporting it up to date.
#[derive(Debug)]
pub struct GitHubSource {
    /// API client
    pub client: Client,
    /// `owner/repo`
    pub repo: String,
    /// Append `.0` to three-part tags.
    pub append_dot_zero: bool,
    /// Capture the release body as `releasenotes`.
    pub want_notes: bool,
    /// Capture the release page as `releasenotesurl`.
    pub want_notes_url: bool,
}

#[async_trait]
impl VersionSource for GitHubSource {
    fn kind(&self) -> &'static str {
        "github"
    }

    async fn discover(&self) -> Result<Option<Discovered>, DiscoveryError> {
        let Some(release) = self.client.latest_release(&self.repo).await? else {
            return Ok(None);
        };

        let mut v = version::strip_tag_prefix(&release.tag_name).to_string();
        if self.append_dot_zero {
            v = version::append_dot_zero(&v);
        }
        info!("latest release of {}: {v}", self.repo);

        let mut found = Discovered::new(v);
        if self.want_notes {
            match release.notes() {
                Some(notes) => {
                    found.metadata.insert("releasenotes".to_string(), notes);
                }
                None => warn!("release notes requested but the release has no body"),
            }
        }
        if self.want_notes_url {
            if release.html_url.is_empty() {
                warn!("release notes url requested but the release has none");
            } else {
                found
                    .metadata
                    .insert("releasenotesurl".to_string(), release.html_url.clone());
            }
        }

        Ok(Some(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    async fn source(server: &mut Server, body: &str, status: usize) -> GitHubSource {
        server
            .mock("GET", "/repos/PowerShell/PowerShell/releases/latest")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
        GitHubSource {
            client: Client::new(None)
                .unwrap()
                .with_bases(server.url(), server.url()),
            repo: "PowerShell/PowerShell".to_string(),
            append_dot_zero: true,
            want_notes: true,
            want_notes_url: true,
        }
    }

    #[tokio::test]
    async fn strips_prefix_and_appends_zero() {
        let mut server = Server::new_async().await;
        let src = source(
            &mut server,
            r#"{"tag_name":"v7.5.4","body":"\n## Changes\n","html_url":"https://github.com/PowerShell/PowerShell/releases/tag/v7.5.4"}"#,
            200,
        )
        .await;

        let found = src.discover().await.unwrap().unwrap();
        assert_eq!(found.version, "7.5.4.0");
        assert_eq!(found.metadata["releasenotes"], "## Changes");
        assert_eq!(
            found.metadata["releasenotesurl"],
            "https://github.com/PowerShell/PowerShell/releases/tag/v7.5.4"
        );
    }

    #[tokio::test]
    async fn missing_release_is_none() {
        let mut server = Server::new_async().await;
        let src = source(&mut server, r#"{"message":"Not Found"}"#, 404).await;
        assert!(src.discover().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_release_is_an_error() {
        let mut server = Server::new_async().await;
        let src = source(&mut server, "<html>rate limited</html>", 200).await;
        assert!(src.discover().await.is_err());
    }

    #[tokio::test]
    async fn empty_body_skips_notes() {
        let mut server = Server::new_async().await;
        let mut src = source(
            &mut server,
            r#"{"tag_name":"7.5.4.1","body":"   ","html_url":""}"#,
            200,
        )
        .await;
        src.append_dot_zero = false;

        let found = src.discover().await.unwrap().unwrap();
        assert_eq!(found.version, "7.5.4.1");
        assert!(found.metadata.is_empty());
    }
}
