//! backplane-cli - the `ocm-backplane` command line client
//!
//! This crate hosts the self-upgrade subsystem of `ocm-backplane`: it
//! checks the published releases of the client, and on confirmation
//! replaces the running executable with the newer build for the current
//! platform, keeping a backup until the new binary is in place.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`ocm-backplane upgrade`)
//! - [`config`] - Global configuration (`~/.backplane/config.toml`)
//! - [`core`] - Error taxonomy and user-friendly error rendering
//! - [`upgrade`] - Release feed, asset resolution, archive extraction and
//!   safe replacement of the executable
//!
//! # Release Layout
//!
//! Releases are published on GitHub with one archive per platform:
//!
//! ```text
//! ocm-backplane_0.0.1_Linux_x86_64.tar.gz
//! ocm-backplane_0.0.1_Darwin_arm64.tar.gz
//! ...
//! ```
//!
//! Each archive contains the `ocm-backplane` executable.
//!
//! # Example
//!
//! ```rust,no_run
//! use backplane_cli::config::GlobalConfig;
//! use backplane_cli::upgrade::{FsSafeWriter, GitHubReleaseSource, SelfUpdater};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load_with_optional(None).await?.upgrade;
//! let source = GitHubReleaseSource::new(&config)?;
//! let updater = SelfUpdater::new(source, FsSafeWriter::new(), config);
//!
//! if let Some(release) = updater.check_for_update(env!("CARGO_PKG_VERSION")).await? {
//!     println!("{} is available", release.tag_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod upgrade;
