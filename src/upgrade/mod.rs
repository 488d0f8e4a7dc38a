//! Self-upgrade of the `ocm-backplane` binary.
//!
//! This module replaces the running executable with the latest published
//! release. It is split along three seams so that each can be exercised on
//! its own:
//!
//! - **[`ReleaseSource`]**: where releases come from. [`GitHubReleaseSource`]
//!   reads the GitHub releases API and downloads archive assets.
//! - **[`SafeWriter`]**: how the executable is replaced on disk.
//!   [`FsSafeWriter`] renames the old binary aside, writes the new one and
//!   restores the backup if the write fails.
//! - **[`SelfUpdater`]**: the policy tying them together: version comparison,
//!   user confirmation, archive extraction and error reporting.
//!
//! # Update Process Flow
//!
//! ```text
//! 1. Fetch
//!    └── GET {base_url}/releases/latest
//!
//! 2. Version check
//!    ├── Parse running and latest versions (leading 'v' ignored)
//!    └── Stop with "No upgrade available." unless latest is newer
//!
//! 3. Confirm
//!    └── Only "y" (any case) proceeds
//!
//! 4. Download and extract
//!    ├── Pick {binary}_{version}_{OS}_{Arch}.tar.gz from the release assets
//!    └── Scan the archive for the entry named {binary}
//!
//! 5. Replace
//!    ├── Rename executable to {path}_{YYYY.MM.DD_HH:MM:SS}
//!    ├── Write new bytes, mode 0755
//!    └── Remove backup on success, rename it back on failure
//! ```
//!
//! # Usage
//!
//! ```bash
//! ocm-backplane upgrade           # Prompt, then upgrade to the latest release
//! ocm-backplane -v upgrade        # Same, with debug logging on stderr
//! ```
//!
//! # Non-Features
//!
//! Downgrades, pinned versions, checksum or signature verification and
//! release channels are not supported. The latest published release is the
//! only candidate.

/// Extraction of the binary from a `.tar.gz` release archive.
pub mod archive;
/// Mapping from the running platform to the expected release asset.
pub mod asset;
/// Rename-based backup of the executable during replacement.
pub mod backup;
/// The `[upgrade]` section of the global configuration.
pub mod config;
/// Release feed models and the GitHub-backed [`ReleaseSource`].
pub mod release;
/// The upgrade orchestrator.
pub mod self_updater;
/// Crash-safe replacement of the executable on disk.
pub mod writer;

#[cfg(test)]
mod tests;

pub use asset::Platform;
pub use config::UpgradeConfig;
pub use release::{GitHubReleaseSource, Release, ReleaseAsset, ReleaseSource};
pub use self_updater::{SelfUpdater, UpgradeOutcome, parse_version};
pub use writer::{FsSafeWriter, SafeWriter};
