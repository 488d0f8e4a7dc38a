//! Platform asset resolution.
//!
//! Release archives are published one per platform under a fixed name:
//!
//! ```text
//! {binary}_{version without leading v}_{OS}_{Arch}.tar.gz
//! ocm-backplane_0.0.1_Darwin_arm64.tar.gz
//! ```
//!
//! Matching is exact string equality. An asset whose name differs by a
//! single character is treated as absent, so a near-miss can never install
//! an executable built for another platform.

use super::release::{Release, ReleaseAsset};
use tracing::debug;

/// The host operating system and architecture, in release-asset spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Mapped OS name (`Linux`, `Darwin`, `Windows`), empty when unsupported.
    pub os: String,
    /// Mapped architecture name (`x86_64`, `arm64`, or the raw value).
    pub arch: String,
}

impl Platform {
    /// Build a platform from runtime OS/arch identifiers.
    ///
    /// Accepts both Go-style (`darwin`, `amd64`) and Rust-style (`macos`,
    /// `x86_64`, `aarch64`) identifiers.
    #[must_use]
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: map_os(os).to_string(),
            arch: map_arch(arch),
        }
    }

    /// The platform of the running process.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Whether the OS is one releases are published for.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !self.os.is_empty()
    }
}

/// Map an OS identifier to its release-asset name. Unknown OSes map to `""`.
fn map_os(os: &str) -> &'static str {
    match os {
        "linux" => "Linux",
        "darwin" | "macos" => "Darwin",
        "windows" => "Windows",
        _ => "",
    }
}

/// Map an architecture identifier to its release-asset name.
/// Unknown architectures pass through unchanged.
fn map_arch(arch: &str) -> String {
    match arch {
        "amd64" | "x86_64" => "x86_64".to_string(),
        "arm64" | "aarch64" => "arm64".to_string(),
        other => other.to_string(),
    }
}

/// Compute the expected asset name for a release tag on a platform.
#[must_use]
pub fn asset_name(binary_name: &str, tag: &str, platform: &Platform) -> String {
    let version = tag.strip_prefix('v').unwrap_or(tag);
    format!("{binary_name}_{version}_{}_{}.tar.gz", platform.os, platform.arch)
}

/// Find the release asset for `platform`. The first exact match wins.
#[must_use]
pub fn find_asset<'a>(
    release: &'a Release,
    binary_name: &str,
    platform: &Platform,
) -> Option<&'a ReleaseAsset> {
    if !platform.is_supported() {
        debug!("No release assets are published for this OS");
        return None;
    }

    let expected = asset_name(binary_name, &release.tag_name, platform);
    let found = release.assets.iter().find(|asset| asset.name == expected);

    debug!(
        "Looking for asset '{}' in release {} ({} assets): {}",
        expected,
        release.tag_name,
        release.assets.len(),
        if found.is_some() { "found" } else { "not found" }
    );

    found
}
