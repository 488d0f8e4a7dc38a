use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::BackplaneError;

/// Timestamp suffix appended to backup file names.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y.%m.%d_%H:%M:%S";

/// Manages the backup of an executable while it is being replaced.
///
/// `BackupManager` moves the current executable aside by renaming it to a
/// sibling named `{path}_{YYYY.MM.DD_HH:MM:SS}`. Renaming within one
/// directory is atomic on POSIX filesystems, so at every instant either the
/// original path or the backup path holds a complete copy of the old binary.
///
/// # Lifecycle
///
/// 1. [`create_backup`](Self::create_backup) renames the executable away
/// 2. the caller writes the new executable to the original path
/// 3. on success [`cleanup_backup`](Self::cleanup_backup) deletes the backup,
///    on failure [`restore_backup`](Self::restore_backup) renames it back
///
/// # Examples
///
/// ```rust,no_run
/// use backplane_cli::upgrade::backup::BackupManager;
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = BackupManager::new(PathBuf::from("/usr/local/bin/ocm-backplane"));
/// manager.create_backup().await?;
///
/// // ... write the new binary ...
/// let write_succeeded = true;
///
/// if write_succeeded {
///     manager.cleanup_backup().await?;
/// } else {
///     manager.restore_backup().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Path to the executable being protected.
    original_path: PathBuf,
    /// Path the executable is moved to while the new one is written.
    backup_path: PathBuf,
}

impl BackupManager {
    /// Create a manager for `executable_path`, timestamped with the current local time.
    pub fn new(executable_path: PathBuf) -> Self {
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(executable_path, &timestamp)
    }

    /// Create a manager whose backup file uses the given timestamp suffix.
    pub fn with_timestamp(executable_path: PathBuf, timestamp: &str) -> Self {
        let mut backup = executable_path.clone().into_os_string();
        backup.push("_");
        backup.push(timestamp);

        Self {
            original_path: executable_path,
            backup_path: PathBuf::from(backup),
        }
    }

    /// Move the executable to the backup path.
    ///
    /// Refuses to overwrite an existing file at the backup path, since that
    /// file may be the only copy left by an earlier interrupted upgrade.
    pub async fn create_backup(&self) -> Result<(), BackplaneError> {
        let backup_failed = |source| BackplaneError::BackupFailed {
            path: self.original_path.clone(),
            backup: self.backup_path.clone(),
            source,
        };

        if fs::try_exists(&self.backup_path).await.map_err(backup_failed)? {
            return Err(backup_failed(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "a file already exists at the backup path",
            )));
        }

        info!("Backing up {:?} to {:?}", self.original_path, self.backup_path);
        fs::rename(&self.original_path, &self.backup_path).await.map_err(backup_failed)
    }

    /// Rename the backup over the executable path.
    ///
    /// Returns the raw I/O error so the caller can decide how severe a failed
    /// restoration is.
    pub async fn restore_backup(&self) -> std::io::Result<()> {
        warn!("Restoring {:?} from backup {:?}", self.original_path, self.backup_path);
        fs::rename(&self.backup_path, &self.original_path).await?;
        info!("Restored previous binary");
        Ok(())
    }

    /// Delete the backup after the new executable is in place.
    pub async fn cleanup_backup(&self) -> Result<(), BackplaneError> {
        debug!("Removing backup {:?}", self.backup_path);
        fs::remove_file(&self.backup_path).await.map_err(|source| {
            BackplaneError::CleanupFailed {
                backup: self.backup_path.clone(),
                source,
            }
        })
    }

    /// The path the executable is moved to.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}
