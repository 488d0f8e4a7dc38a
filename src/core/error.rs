//! Error handling for the backplane CLI
//!
//! Two layers, in the same way the rest of the crate reports failures:
//! 1. [`BackplaneError`] - a strongly-typed enum for every failure the upgrade
//!    subsystem can distinguish, so callers (and tests) can match on the exact
//!    condition instead of parsing messages.
//! 2. [`ErrorContext`] - a wrapper that adds user-facing details and an
//!    actionable suggestion before the CLI prints the error and exits non-zero.
//!
//! Orchestration code returns [`anyhow::Result`] and adds `.context(...)`
//! describing the step that failed. The typed error stays reachable through
//! [`anyhow::Error::downcast_ref`], which is how [`user_friendly_error`] picks
//! a suggestion.
//!
//! # Error Categories
//!
//! - **Connectivity**: [`BackplaneError::Unreachable`], [`BackplaneError::Transport`],
//!   [`BackplaneError::RequestFailed`], [`BackplaneError::Timeout`],
//!   [`BackplaneError::Cancelled`]
//! - **Feed shape**: [`BackplaneError::FeedDecode`]
//! - **Platform mismatch**: [`BackplaneError::ArchiveNotFound`]
//! - **Version format**: [`BackplaneError::InvalidVersion`]
//! - **Archive integrity**: [`BackplaneError::BinaryNotFound`], [`BackplaneError::ArchiveRead`]
//! - **Filesystem**: [`BackplaneError::NotAFile`], [`BackplaneError::BackupFailed`],
//!   [`BackplaneError::WriteFailed`], [`BackplaneError::RollbackFailed`],
//!   [`BackplaneError::CleanupFailed`], [`BackplaneError::ExecutablePath`]
//! - **Configuration**: [`BackplaneError::ConfigError`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use backplane_cli::core::{BackplaneError, user_friendly_error};
//!
//! let err = anyhow::Error::from(BackplaneError::ArchiveNotFound {
//!     asset: "ocm-backplane_1.0.0_Linux_riscv64.tar.gz".to_string(),
//!     os: "Linux".to_string(),
//!     arch: "riscv64".to_string(),
//! });
//!
//! let ctx = user_friendly_error(err);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The typed error for backplane upgrade operations.
///
/// Every variant names one distinguishable failure mode. Filesystem variants
/// record how far the on-disk swap progressed, so a caller can tell "nothing
/// was touched" ([`BackupFailed`](Self::BackupFailed)) from "the old binary
/// was restored" ([`WriteFailed`](Self::WriteFailed)) from "the binary may be
/// missing" ([`RollbackFailed`](Self::RollbackFailed)).
#[derive(Error, Debug)]
pub enum BackplaneError {
    /// DNS resolution of the update server failed during the pre-flight check.
    #[error("Cannot reach update server '{host}'")]
    Unreachable {
        /// Host name that failed to resolve
        host: String,
        /// Underlying resolver error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request could not be completed (connection refused, TLS, reset...).
    #[error("Request to {url} failed")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Request to {url} failed with HTTP status {status}")]
    RequestFailed {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// The request did not finish before its deadline.
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout {
        /// Requested URL
        url: String,
        /// Deadline that elapsed
        seconds: u64,
    },

    /// The operation was cancelled by the user or the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The release feed did not have the expected JSON shape.
    #[error("Failed to decode release feed from {url}")]
    FeedDecode {
        /// Feed URL
        url: String,
        /// JSON decoding error
        #[source]
        source: serde_json::Error,
    },

    /// The release has no archive for the host platform.
    #[error("Release archive not found for this platform (expected asset '{asset}')")]
    ArchiveNotFound {
        /// Asset name that was looked for
        asset: String,
        /// Mapped operating system name (empty when unsupported)
        os: String,
        /// Mapped architecture name
        arch: String,
    },

    /// A version string is not a valid semantic version.
    #[error("Invalid semantic version '{version}'")]
    InvalidVersion {
        /// The rejected version string
        version: String,
        /// Parser error
        #[source]
        source: semver::Error,
    },

    /// The archive stream ended without an entry for the binary.
    #[error("Binary '{name}' not found in release archive")]
    BinaryNotFound {
        /// Binary name that was looked for
        name: String,
    },

    /// The archive could not be decompressed or read as tar.
    #[error("Failed to read release archive")]
    ArchiveRead {
        /// Underlying gzip or tar error
        #[source]
        source: std::io::Error,
    },

    /// The target path exists but is not a regular file.
    #[error("Cannot replace '{}': not a file", path.display())]
    NotAFile {
        /// Offending path
        path: PathBuf,
    },

    /// The existing executable could not be moved aside. Nothing was modified.
    #[error("Failed to back up '{}' to '{}'", path.display(), backup.display())]
    BackupFailed {
        /// Executable path
        path: PathBuf,
        /// Intended backup path
        backup: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the new executable failed. The previous one was restored if it existed.
    #[error("Failed to write new binary to '{}'", path.display())]
    WriteFailed {
        /// Executable path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing failed and moving the backup back also failed.
    #[error(
        "Failed to write new binary to '{}' ({write_error}) and failed to restore the backup; \
         the previous binary is at '{}'",
        path.display(),
        backup.display()
    )]
    RollbackFailed {
        /// Executable path
        path: PathBuf,
        /// Backup that still holds the previous binary
        backup: PathBuf,
        /// The original write error
        write_error: std::io::Error,
        /// The restoration error
        #[source]
        source: std::io::Error,
    },

    /// The new binary is in place but the backup could not be removed.
    #[error("Upgrade succeeded but the backup '{}' could not be removed", backup.display())]
    CleanupFailed {
        /// Backup left on disk
        backup: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The path of the running executable could not be determined.
    #[error("Failed to determine the current executable path")]
    ExecutablePath {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file problems.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },
}

/// An error paired with user-facing details and a suggestion.
///
/// Produced by [`user_friendly_error`] and printed by the CLI entry point.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error, including its context chain
    pub error: anyhow::Error,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {:#}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion for the user.
///
/// The typed [`BackplaneError`] is looked up anywhere in the context chain;
/// errors that carry no typed cause are returned without a suggestion.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let Some(typed) = error.downcast_ref::<BackplaneError>() else {
        if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
            let details = toml_error.to_string();
            return ErrorContext::new(error)
                .with_suggestion("Check the TOML syntax of your backplane config file")
                .with_details(details);
        }
        return ErrorContext::new(error);
    };

    let (suggestion, details): (String, Option<String>) = match typed {
        BackplaneError::Unreachable { .. } | BackplaneError::Transport { .. } => (
            "Check your network connection and proxy settings, then try again".to_string(),
            Some("The update server could not be reached".to_string()),
        ),
        BackplaneError::RequestFailed { status, .. } => (
            "Try again later; if it keeps failing, check the configured base_url".to_string(),
            Some(format!("The update server answered with HTTP {status}")),
        ),
        BackplaneError::Timeout { .. } => (
            "Try again, or raise upgrade.timeout_secs in your config file".to_string(),
            None,
        ),
        BackplaneError::Cancelled => ("Re-run the command to start over".to_string(), None),
        BackplaneError::FeedDecode { .. } => (
            "Check that base_url points at a releases API".to_string(),
            Some("The release feed response was not the expected JSON document".to_string()),
        ),
        BackplaneError::ArchiveNotFound { os, arch, .. } => (
            "Download a build for your platform manually from the releases page".to_string(),
            Some(format!(
                "Unsupported platform: the latest release has no archive for {} {}",
                if os.is_empty() { "this OS" } else { os.as_str() },
                arch
            )),
        ),
        BackplaneError::InvalidVersion { .. } => (
            "Report this issue; release tags and build versions must be semantic versions"
                .to_string(),
            None,
        ),
        BackplaneError::BinaryNotFound { .. } | BackplaneError::ArchiveRead { .. } => (
            "The release archive looks broken; try again later or install manually".to_string(),
            None,
        ),
        BackplaneError::NotAFile { .. } => (
            "Make sure the executable path points at a regular file".to_string(),
            None,
        ),
        BackplaneError::BackupFailed { .. } | BackplaneError::WriteFailed { .. } => (
            "Check write permissions on the install directory (you may need sudo)".to_string(),
            Some("The installed binary was left unchanged".to_string()),
        ),
        BackplaneError::RollbackFailed { backup, path, .. } => (
            format!(
                "Restore the previous binary manually: mv '{}' '{}'",
                backup.display(),
                path.display()
            ),
            Some("The binary may be missing or incomplete".to_string()),
        ),
        BackplaneError::CleanupFailed { backup, .. } => (
            format!("Remove the leftover backup manually: rm '{}'", backup.display()),
            Some("The new binary was installed successfully".to_string()),
        ),
        BackplaneError::ExecutablePath { .. } => (
            "Re-run the command using the full path to the binary".to_string(),
            None,
        ),
        BackplaneError::ConfigError { .. } => (
            "Fix or remove the backplane config file".to_string(),
            None,
        ),
    };

    let ctx = ErrorContext::new(error).with_suggestion(suggestion);
    match details {
        Some(details) => ctx.with_details(details),
        None => ctx,
    }
}
