//! Global configuration for `ocm-backplane`.
//!
//! The global configuration file is a user-wide TOML document. Only the
//! `[upgrade]` section is understood; unknown sections and keys are
//! rejected so that typos surface instead of being silently ignored.
//!
//! # Configuration File Location
//!
//! The file is looked up in this order:
//!
//! 1. The `--config <path>` command line flag
//! 2. The `BACKPLANE_CONFIG` environment variable
//! 3. `~/.backplane/config.toml`
//!
//! A missing file is not an error: every setting has a default.
//!
//! # File Format
//!
//! ```toml
//! [upgrade]
//! org = "openshift"
//! repo = "backplane-cli"
//! binary_name = "ocm-backplane"
//! # Point at a mirror of the GitHub releases API
//! base_url = "https://mirror.example.com/repos/openshift/backplane-cli"
//! timeout_secs = 60
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use backplane_cli::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load_with_optional(None).await?;
//! println!("Upgrading from {}", config.upgrade.repository());
//! # Ok(())
//! # }
//! ```

use crate::upgrade::config::UpgradeConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "BACKPLANE_CONFIG";

/// User-wide configuration loaded from `~/.backplane/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Self-upgrade settings.
    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load the configuration from `path`, or from the default location.
    ///
    /// When `path` is `None`, `BACKPLANE_CONFIG` is consulted before
    /// [`default_path`](Self::default_path). If the resolved file does not
    /// exist, the default configuration is returned.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(path) if !path.is_empty() => PathBuf::from(path),
                _ => Self::default_path()?,
            },
        };

        let exists = fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to access global config at {}", path.display()))?;

        if exists {
            Self::load_from(&path).await
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and parse the configuration file at `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;

        config
            .upgrade
            .validate()
            .with_context(|| format!("Invalid global config in {}", path.display()))?;

        debug!("Loaded global config from {}", path.display());
        Ok(config)
    }

    /// The default configuration file path, `~/.backplane/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;

        Ok(home.join(".backplane").join("config.toml"))
    }
}
