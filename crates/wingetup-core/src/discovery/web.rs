use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{Discovered, DiscoveryError, VersionSource};

const PATTERNS: [&str; 3] = [
    r#"version["\s:]+(\d+\.\d+\.\d+)"#,
    r"v(\d+\.\d+\.\d+)",
    r"(\d+\.\d+\.\d+)",
];

static VERSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("static regex")
        })
        .collect()
});

/// Scrapes a vendor page for the first `x.y.z` looking string.
#[derive(Debug)]
pub struct WebSource {
    url: String,
    client: reqwest::Client,
}

impl WebSource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: String) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl VersionSource for WebSource {
    fn kind(&self) -> &'static str {
        "web"
    }

    async fn discover(&self) -> Result<Option<Discovered>, DiscoveryError> {
        debug!("scraping {}", self.url);
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(scrape_version(&body).map(Discovered::new))
    }
}

/// Try each version pattern in order; the first match wins.
pub fn scrape_version(content: &str) -> Option<String> {
    VERSION_PATTERNS
        .iter()
        .find_map(|re| re.captures(content))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn prefers_labelled_versions() {
        let html = r#"<p>Build 9.9.9</p><span>Version: 25.8.3</span>"#;
        assert_eq!(scrape_version(html).as_deref(), Some("25.8.3"));
        assert_eq!(scrape_version("download V1.2.3 now").as_deref(), Some("1.2.3"));
        assert_eq!(scrape_version("released 4.5.6").as_deref(), Some("4.5.6"));
        assert!(scrape_version("no numbers").is_none());
    }

    #[tokio::test]
    async fn scrapes_page() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/pc")
            .with_status(200)
            .with_body(r#"<a href="/ZaloSetup-25.8.3.exe">"version": "25.8.3"</a>"#)
            .create_async()
            .await;

        let source = WebSource::new(format!("{}/pc", server.url())).unwrap();
        let found = source.discover().await.unwrap().unwrap();
        assert_eq!(found.version, "25.8.3");
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let mut server = Server::new_async().await;
        server.mock("GET", "/gone").with_status(500).create_async().await;

        let source = WebSource::new(format!("{}/gone", server.url())).unwrap();
        assert!(matches!(source.discover().await, Err(DiscoveryError::Http(_))));
    }
}
