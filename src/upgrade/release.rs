//! Release feed access.
//!
//! [`ReleaseSource`] is the capability the upgrade orchestrator needs from
//! the outside world: the latest release descriptor, the archive bytes for
//! the host platform, and a cheap reachability probe. [`GitHubReleaseSource`]
//! implements it over HTTP against a GitHub-compatible releases API:
//!
//! ```text
//! GET {base_url}/releases/latest
//! { "tag_name": "v1.2.3",
//!   "assets": [ { "name": "...", "browser_download_url": "..." } ] }
//! ```
//!
//! Every request issues exactly one HTTP call. There is no retry here;
//! retrying is a decision for the caller.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::asset::{Platform, asset_name, find_asset};
use super::config::UpgradeConfig;
use crate::core::BackplaneError;

/// One published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Version tag, e.g. `v1.2.3`.
    pub tag_name: String,
    /// Downloadable files attached to the release.
    pub assets: Vec<ReleaseAsset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// File name, matched exactly against the platform template.
    pub name: String,
    /// Fetch location. Only ever used as a GET target.
    pub browser_download_url: String,
}

/// Source of releases for the self-updater.
///
/// Implementations must honour `cancel`: once it fires, the in-flight request
/// is dropped and [`BackplaneError::Cancelled`] is returned.
pub trait ReleaseSource {
    /// Fetch the latest release descriptor.
    fn get_latest_release(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Release, BackplaneError>> + Send;

    /// Download the archive for the host platform from `release`.
    ///
    /// Fails with [`BackplaneError::ArchiveNotFound`] when the release has no
    /// asset for this platform.
    fn get_release_archive(
        &self,
        release: &Release,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>, BackplaneError>> + Send;

    /// Check that the update server's host name resolves.
    fn check_connection(&self) -> impl Future<Output = Result<(), BackplaneError>> + Send;
}

/// [`ReleaseSource`] backed by a GitHub-compatible releases API.
#[derive(Debug, Clone)]
pub struct GitHubReleaseSource {
    client: reqwest::Client,
    base_url: String,
    binary_name: String,
    platform: Platform,
    timeout: Duration,
}

impl GitHubReleaseSource {
    /// Create a source for the feed described by `config`, targeting the
    /// platform of the running process.
    pub fn new(config: &UpgradeConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("ocm-backplane/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            binary_name: config.binary_name.clone(),
            platform: Platform::current(),
            timeout: config.timeout(),
        })
    }

    /// Resolve assets for `platform` instead of the running process.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// The feed base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `url` and return the whole body.
    ///
    /// The timeout bounds the wait for response headers and every gap
    /// between body chunks, not the whole transfer, so a large archive on a
    /// slow but live link still completes. `cancel` aborts at any point.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, BackplaneError> {
        debug!("GET {}", url);

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("GET {} cancelled", url);
                Err(BackplaneError::Cancelled)
            }
            result = self.fetch_body(url) => result,
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>, BackplaneError> {
        let timed_out = || BackplaneError::Timeout {
            url: url.to_string(),
            seconds: self.timeout.as_secs(),
        };
        let transport = |source| BackplaneError::Transport {
            url: url.to_string(),
            source,
        };

        let mut response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| timed_out())?
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackplaneError::RequestFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = tokio::time::timeout(self.timeout, response.chunk())
            .await
            .map_err(|_| timed_out())?
            .map_err(transport)?
        {
            body.extend_from_slice(&chunk);
        }

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(body)
    }
}

impl ReleaseSource for GitHubReleaseSource {
    async fn get_latest_release(&self, cancel: &CancellationToken) -> Result<Release, BackplaneError> {
        let url = format!("{}/releases/latest", self.base_url);
        let body = self.fetch(&url, cancel).await?;

        serde_json::from_slice(&body).map_err(|source| BackplaneError::FeedDecode {
            url,
            source,
        })
    }

    async fn get_release_archive(
        &self,
        release: &Release,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, BackplaneError> {
        let asset = find_asset(release, &self.binary_name, &self.platform).ok_or_else(|| {
            BackplaneError::ArchiveNotFound {
                asset: asset_name(&self.binary_name, &release.tag_name, &self.platform),
                os: self.platform.os.clone(),
                arch: self.platform.arch.clone(),
            }
        })?;

        debug!("Downloading {} from {}", asset.name, asset.browser_download_url);
        self.fetch(&asset.browser_download_url, cancel).await
    }

    async fn check_connection(&self) -> Result<(), BackplaneError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| BackplaneError::ConfigError {
            message: format!("invalid upgrade base_url '{}': {e}", self.base_url),
        })?;
        let Some(host_str) = url.host_str() else {
            return Err(BackplaneError::ConfigError {
                message: format!("upgrade base_url '{}' has no host", self.base_url),
            });
        };
        // IP literals (including bracketed IPv6) need no resolution
        let Some(domain) = url.domain() else {
            debug!("{} is an IP address, skipping DNS lookup", host_str);
            return Ok(());
        };
        let host = domain.to_string();
        let port = url.port_or_known_default().unwrap_or(443);

        let unreachable = |source| BackplaneError::Unreachable {
            host: host.clone(),
            source,
        };

        debug!("Resolving {}:{}", host, port);
        let lookup = tokio::net::lookup_host((host.as_str(), port));
        let mut addrs = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result.map_err(unreachable)?,
            Err(_) => {
                return Err(unreachable(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "DNS lookup timed out",
                )));
            }
        };

        if addrs.next().is_none() {
            return Err(unreachable(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host has no addresses",
            )));
        }

        Ok(())
    }
}
