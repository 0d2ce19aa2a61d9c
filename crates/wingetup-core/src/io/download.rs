//! Installer downloads with streaming SHA256.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use wingetup_schema::InstallerSha256;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Downloaded file is empty: {0}")]
    Empty(String),
}

/// Size and digest of a downloaded installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub bytes: u64,
    pub sha256: InstallerSha256,
}

/// HTTP client used for installer downloads.
///
/// # Errors
///
/// Returns an error if the client cannot be constructed.
pub fn client() -> Result<Client, DownloadError> {
    Ok(Client::builder()
        .user_agent(crate::USER_AGENT)
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?)
}

/// Stream `url` into `dest`, hashing while writing.
///
/// # Errors
///
/// Returns an error on HTTP failure, write failure, or an empty body.
pub async fn download_to(client: &Client, url: &str, dest: &Path) -> Result<Downloaded, DownloadError> {
    info!("downloading {url}");
    let resp = client.get(url).send().await?.error_for_status()?;

    let mut file = File::create(dest).await?;
    let mut stream = resp.bytes_stream();
    let mut hasher = Sha256::new();
    let mut bytes: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    if bytes == 0 {
        tokio::fs::remove_file(dest).await.ok();
        return Err(DownloadError::Empty(url.to_string()));
    }

    let sha256 = InstallerSha256::from_bytes(&hasher.finalize());
    debug!("{} ({bytes} bytes): {sha256}", dest.display());
    Ok(Downloaded { bytes, sha256 })
}

/// Stream `url` through SHA256 without touching disk.
///
/// # Errors
///
/// Returns an error on HTTP failure or an empty body.
pub async fn hash_url(client: &Client, url: &str) -> Result<Downloaded, DownloadError> {
    info!("hashing {url}");
    let mut resp = client.get(url).send().await?.error_for_status()?;
    let mut hasher = Sha256::new();
    let mut bytes: u64 = 0;

    while let Some(chunk) = resp.chunk().await? {
        hasher.update(&chunk);
        bytes += chunk.len() as u64;
    }

    if bytes == 0 {
        return Err(DownloadError::Empty(url.to_string()));
    }
    Ok(Downloaded {
        bytes,
        sha256: InstallerSha256::from_bytes(&hasher.finalize()),
    })
}

/// `HEAD` the URL (following redirects); `true` on a 200 reply.
pub async fn url_exists(client: &Client, url: &str) -> bool {
    match client.head(url).timeout(HEAD_TIMEOUT).send().await {
        Ok(resp) if resp.status() == reqwest::StatusCode::OK => true,
        Ok(resp) => {
            warn!("installer {url} returned {}", resp.status());
            false
        }
        Err(e) => {
            warn!("could not verify installer {url}: {e}");
            false
        }
    }
}
