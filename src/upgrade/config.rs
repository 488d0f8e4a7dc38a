use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::BackplaneError;

/// Configuration for the self-upgrade subsystem.
///
/// `UpgradeConfig` names the release feed to query and the binary to look
/// for inside release archives. It is passed explicitly into
/// [`GitHubReleaseSource`](crate::upgrade::GitHubReleaseSource) and
/// [`SelfUpdater`](crate::upgrade::SelfUpdater); there is no process-wide
/// mutable options state.
///
/// # Default Behavior
///
/// - Releases come from `openshift/backplane-cli` on the GitHub releases API
/// - Archives are expected to contain a binary named `ocm-backplane`
/// - A request is abandoned after 60 seconds without response headers or body data
///
/// # TOML Example
/// ```toml
/// [upgrade]
/// org = "openshift"
/// repo = "backplane-cli"
/// binary_name = "ocm-backplane"
/// base_url = "https://mirror.example.com/repos/openshift/backplane-cli"
/// timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpgradeConfig {
    /// Organization (owner) publishing the releases.
    #[serde(default = "default_org")]
    pub org: String,

    /// Repository publishing the releases.
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Name of the executable inside release archives, and the prefix of
    /// every release asset name.
    #[serde(default = "default_binary_name")]
    pub binary_name: String,

    /// Base URL of the release feed. `{base_url}/releases/latest` must return
    /// the latest release document.
    ///
    /// When unset, the GitHub API URL for `org/repo` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Seconds to wait for response headers, and for each chunk of the body.
    /// Must be at least 1.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            org: default_org(),
            repo: default_repo(),
            binary_name: default_binary_name(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_org() -> String {
    "openshift".to_string()
}

fn default_repo() -> String {
    "backplane-cli".to_string()
}

fn default_binary_name() -> String {
    "ocm-backplane".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

impl UpgradeConfig {
    /// Create an `UpgradeConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The "org/repo" identity, used in log lines and error messages.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// The effective feed base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://api.github.com/repos/{}/{}", self.org, self.repo),
        }
    }

    /// Reject settings no upgrade could succeed with.
    pub fn validate(&self) -> Result<(), BackplaneError> {
        if self.timeout_secs == 0 {
            return Err(BackplaneError::ConfigError {
                message: "upgrade.timeout_secs must be at least 1".to_string(),
            });
        }
        if self.binary_name.trim().is_empty() {
            return Err(BackplaneError::ConfigError {
                message: "upgrade.binary_name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The deadline for response headers and for each gap between body chunks.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
