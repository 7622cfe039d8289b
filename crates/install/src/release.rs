//! Buildx release metadata.
//!
//! Releases are looked up in JSON feeds keyed by tag plus a `latest` entry,
//! so resolving a version needs no GitHub API token.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use setup_buildx_core::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Feed of regular buildx releases.
pub const BUILDX_RELEASES_URL: &str =
    "https://raw.githubusercontent.com/docker/actions-toolkit/main/.github/buildx-releases.json";

/// Feed of Docker Build Cloud (buildx-desktop) releases.
pub const BUILDX_LAB_RELEASES_URL: &str =
    "https://raw.githubusercontent.com/docker/actions-toolkit/main/.github/buildx-lab-releases.json";

/// One release entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// GitHub release id.
    pub id: u64,
    /// Tag, e.g. `v0.11.2`.
    pub tag_name: String,
    /// Release page.
    pub html_url: String,
}

impl Release {
    /// Tag without leading or trailing `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        self.tag_name.trim_matches('v')
    }
}

/// Which buildx distribution a selector points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// github.com/docker/buildx
    Buildx,
    /// github.com/docker/buildx-desktop, used by the cloud driver.
    Cloud,
}

impl Channel {
    /// URL of the release feed.
    #[must_use]
    pub fn feed_url(self) -> &'static str {
        match self {
            Self::Buildx => BUILDX_RELEASES_URL,
            Self::Cloud => BUILDX_LAB_RELEASES_URL,
        }
    }

    /// GitHub repository hosting the binaries.
    #[must_use]
    pub fn repository(self) -> &'static str {
        match self {
            Self::Buildx => "docker/buildx",
            Self::Cloud => "docker/buildx-desktop",
        }
    }

    /// Tool name used as the cache key.
    #[must_use]
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Buildx => "buildx",
            Self::Cloud => "buildx-desktop",
        }
    }

    /// Download URL of an asset.
    #[must_use]
    pub fn download_url(self, version: &str, asset: &str) -> String {
        format!(
            "https://github.com/{}/releases/download/v{version}/{asset}",
            self.repository()
        )
    }
}

/// Split a version selector into its channel and tag (`cloud:latest` → cloud, `latest`).
#[must_use]
pub fn parse_selector(selector: &str) -> (Channel, &str) {
    let selector = selector.trim();
    for prefix in ["cloud:", "lab:"] {
        if let Some(rest) = selector.strip_prefix(prefix) {
            return (Channel::Cloud, rest);
        }
    }
    (Channel::Buildx, selector)
}

/// Network access needed to install buildx.
#[async_trait]
pub trait ReleaseClient: Send + Sync {
    /// Fetch a release feed.
    async fn releases(&self, feed_url: &str) -> Result<HashMap<String, Release>>;

    /// Download `url` to `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Find the release matching `tag` (`latest`, `v0.11.2` or `0.11.2`).
pub async fn resolve_release(
    client: &dyn ReleaseClient,
    channel: Channel,
    tag: &str,
) -> Result<Release> {
    let url = channel.feed_url();
    let releases = client.releases(url).await?;
    let tag = if tag.is_empty() { "latest" } else { tag };
    releases
        .get(tag)
        .or_else(|| releases.get(&format!("v{tag}")))
        .cloned()
        .ok_or_else(|| Error::release_not_found(tag, url))
}

/// [`ReleaseClient`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpReleaseClient {
    client: Client,
}

impl HttpReleaseClient {
    /// Create a client identifying as setup-buildx.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("setup-buildx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Failed to fetch {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::http(format!(
                "Failed to fetch {url} (HTTP {})",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ReleaseClient for HttpReleaseClient {
    async fn releases(&self, feed_url: &str) -> Result<HashMap<String, Release>> {
        self.get(feed_url)
            .await?
            .json()
            .await
            .map_err(|e| Error::http(format!("Failed to parse {feed_url}: {e}")))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to download {url}: {e}")))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(e, parent))?;
        }
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| Error::io(e, dest))?;
        debug!(%url, dest = %dest.display(), size = bytes.len(), "Downloaded");
        Ok(())
    }
}
