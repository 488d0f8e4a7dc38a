use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use semver::Version;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::archive::extract_binary;
use super::config::UpgradeConfig;
use super::release::{Release, ReleaseSource};
use super::writer::SafeWriter;
use crate::core::BackplaneError;

/// How an upgrade attempt ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// The running version is the latest (or newer). Nothing was downloaded.
    UpToDate,
    /// The user declined the confirmation prompt. Nothing was downloaded.
    Cancelled,
    /// The executable was replaced with the given release.
    Upgraded {
        /// Tag of the installed release
        version: String,
    },
}

/// Orchestrates upgrading the running binary to the latest release.
///
/// `SelfUpdater` owns the upgrade policy and nothing else: releases come from
/// a [`ReleaseSource`] and the on-disk swap is delegated to a [`SafeWriter`],
/// so both can be replaced with in-memory fakes.
///
/// # Sequence
///
/// ```text
/// Start -> Fetching -> VersionChecked{no-op | proceed}
///       -> Confirming{cancelled | confirmed}
///       -> Downloading -> Extracting -> Writing -> Done
/// ```
///
/// Each step is a hard gate. A failure ends the attempt at that step; there
/// is no resume, the next invocation starts over.
///
/// # Examples
///
/// ```rust,no_run
/// use backplane_cli::upgrade::{FsSafeWriter, GitHubReleaseSource, SelfUpdater, UpgradeConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = UpgradeConfig::default();
/// let source = GitHubReleaseSource::new(&config)?;
/// let updater = SelfUpdater::new(source, FsSafeWriter::new(), config);
///
/// let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
/// let mut stdout = std::io::stdout();
/// updater.upgrade(env!("CARGO_PKG_VERSION"), &mut stdin, &mut stdout).await?;
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater<S, W> {
    source: S,
    writer: W,
    config: UpgradeConfig,
    /// Overrides the path of the running executable.
    executable_path: Option<PathBuf>,
    cancel: CancellationToken,
}

impl<S: ReleaseSource, W: SafeWriter> SelfUpdater<S, W> {
    /// Create an updater from its collaborators and configuration.
    pub fn new(source: S, writer: W, config: UpgradeConfig) -> Self {
        Self {
            source,
            writer,
            config,
            executable_path: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace `path` instead of the running executable.
    #[must_use]
    pub fn with_executable_path(mut self, path: PathBuf) -> Self {
        self.executable_path = Some(path);
        self
    }

    /// Abort network requests and the confirmation prompt when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &W {
        &self.writer
    }

    /// Fetch the latest release and return it if it is newer than `current_version`.
    ///
    /// Performs no downloads and no filesystem access.
    pub async fn check_for_update(&self, current_version: &str) -> Result<Option<Release>> {
        let repository = self.config.repository();
        debug!("Fetching latest release of {}", repository);

        let latest = self
            .source
            .get_latest_release(&self.cancel)
            .await
            .with_context(|| format!("Failed to fetch latest release of {repository}"))?;

        let current = parse_version(current_version).context("Failed to parse current version")?;
        let latest_version = parse_version(&latest.tag_name)
            .with_context(|| format!("Failed to parse latest release tag of {repository}"))?;

        if current >= latest_version {
            debug!("Current version {} is not older than latest {}", current, latest_version);
            return Ok(None);
        }

        info!("Update available: {} -> {}", current, latest_version);
        Ok(Some(latest))
    }

    /// Upgrade the running binary to the latest release.
    ///
    /// Messages and the confirmation prompt go to `output`; the answer is
    /// read as one line from `input`. Only `y` (any case) proceeds.
    ///
    /// # Errors
    ///
    /// Fails when the feed cannot be read, a version does not parse, the
    /// release has no archive for this platform, the archive has no binary,
    /// or the [`SafeWriter`] fails. Writer errors are returned unchanged.
    pub async fn upgrade<R, O>(
        &self,
        current_version: &str,
        input: &mut R,
        output: &mut O,
    ) -> Result<UpgradeOutcome>
    where
        R: AsyncBufRead + Unpin,
        O: Write,
    {
        let Some(latest) = self.check_for_update(current_version).await? else {
            writeln!(output, "No upgrade available.")?;
            return Ok(UpgradeOutcome::UpToDate);
        };

        if !self.confirm(&latest.tag_name, input, output).await? {
            writeln!(output, "{}", "Upgrade cancelled.".yellow())?;
            return Ok(UpgradeOutcome::Cancelled);
        }

        let repository = self.config.repository();
        debug!("Downloading {} {}", repository, latest.tag_name);
        let archive = self
            .source
            .get_release_archive(&latest, &self.cancel)
            .await
            .with_context(|| {
                format!("Failed to download release {} of {repository}", latest.tag_name)
            })?;

        debug!("Extracting {} from {} byte archive", self.config.binary_name, archive.len());
        let binary = extract_binary(&archive, &self.config.binary_name).with_context(|| {
            format!("Failed to extract release {} of {repository}", latest.tag_name)
        })?;

        let path = match &self.executable_path {
            Some(path) => path.clone(),
            None => std::env::current_exe()
                .map_err(|source| BackplaneError::ExecutablePath { source })?,
        };

        debug!("Writing {} bytes to {:?}", binary.len(), path);
        self.writer.write(&path, &binary).await?;

        info!("Upgraded {} to {}", path.display(), latest.tag_name);
        writeln!(
            output,
            "{}",
            format!("Successfully upgraded to {}.", latest.tag_name).green()
        )?;

        Ok(UpgradeOutcome::Upgraded {
            version: latest.tag_name,
        })
    }

    /// Ask whether to upgrade to `tag`. An empty answer or EOF means no.
    async fn confirm<R, O>(&self, tag: &str, input: &mut R, output: &mut O) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
        O: Write,
    {
        write!(
            output,
            "A new version {} is available. Upgrade {}? [y/N]: ",
            tag.cyan(),
            self.config.binary_name
        )?;
        output.flush()?;

        let mut answer = String::new();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(BackplaneError::Cancelled.into()),
            read = input.read_line(&mut answer) => {
                read.context("Failed to read confirmation")?;
            }
        }

        let confirmed = answer.trim().eq_ignore_ascii_case("y");
        debug!("Confirmation answer {:?}: {}", answer.trim(), confirmed);
        Ok(confirmed)
    }
}

/// Parse a semantic version, ignoring one leading `v`.
pub fn parse_version(version: &str) -> Result<Version, BackplaneError> {
    let trimmed = version.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).map_err(|source| {
        BackplaneError::InvalidVersion {
            version: version.to_string(),
            source,
        }
    })
}
