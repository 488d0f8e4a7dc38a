//! Command-line interface for `ocm-backplane`.
//!
//! This module defines the argument structure with clap and dispatches to
//! command implementations. Only the commands that live in this crate are
//! defined here.
//!
//! # Available Commands
//!
//! - `upgrade` - Upgrade `ocm-backplane` to the latest release
//!
//! # Global Options
//!
//! All commands support these global options:
//! - `--verbose` / `-v` - Enable debug logging
//! - `--quiet` / `-q` - Only log errors
//! - `--config` / `-c` - Path to the global configuration file
//!
//! Logs are written to stderr; `RUST_LOG` takes precedence over both
//! `--verbose` and `--quiet`.
//!
//! # Examples
//!
//! ```bash
//! ocm-backplane upgrade
//! ocm-backplane --verbose upgrade
//! ocm-backplane --config ./backplane.toml upgrade
//! ```

mod upgrade;


use crate::config::GlobalConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime configuration derived from the global command line flags.
///
/// Built once by [`Cli::build_config`] and passed down explicitly, so the
/// flags never need to be smuggled through environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Explicit configuration file from `--config`.
    pub config_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            config_path: None,
        }
    }
}

impl CliConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The log filter to install: `RUST_LOG` if set, else [`log_level`](Self::log_level).
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Main CLI structure for `ocm-backplane`.
#[derive(Parser, Debug)]
#[command(
    name = "ocm-backplane",
    about = "OpenShift backplane command line client",
    version,
    long_about = None
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global configuration file
    ///
    /// Defaults to $BACKPLANE_CONFIG, then ~/.backplane/config.toml.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upgrade ocm-backplane to the latest release
    ///
    /// Compares the running version with the latest published release,
    /// asks for confirmation and replaces this executable in place. The
    /// previous binary is restored if the replacement fails.
    Upgrade(upgrade::UpgradeCommand),
}

impl Cli {
    /// Execute the CLI with configuration derived from the flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Derive the runtime configuration from the parsed flags.
    ///
    /// | Flags | Log level |
    /// |-------|-----------|
    /// | `--verbose` | `debug` |
    /// | `--quiet` | `error` |
    /// | neither | `warn` |
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
        }
    }

    /// Load the global configuration and run the selected command.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let global = GlobalConfig::load_with_optional(config.config_path).await?;

        match self.command {
            Commands::Upgrade(cmd) => cmd.execute(global.upgrade).await,
        }
    }
}
