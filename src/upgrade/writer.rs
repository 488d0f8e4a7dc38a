//! Safe replacement of the live executable.
//!
//! The invariant: a crash at any point never leaves the executable path both
//! missing and without a complete backup next to it. The old binary is moved
//! aside with a rename (never copy + delete), the new bytes are written and
//! synced, and only then is the backup removed.

use std::future::Future;
use std::io;
use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::backup::BackupManager;
use crate::core::BackplaneError;

/// Replaces a file on disk with new contents.
pub trait SafeWriter {
    /// Replace the file at `path` with `data`, made executable.
    ///
    /// Implementations must leave the previous contents recoverable if the
    /// write fails.
    fn write(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl Future<Output = Result<(), BackplaneError>> + Send;
}

/// [`SafeWriter`] that backs up the existing file by renaming it.
///
/// | Situation | Result |
/// |-----------|--------|
/// | path missing | written directly, no backup |
/// | path is a directory | [`BackplaneError::NotAFile`], nothing touched |
/// | rename to backup fails | [`BackplaneError::BackupFailed`], nothing touched |
/// | write fails, restore works | [`BackplaneError::WriteFailed`], old file back in place |
/// | write fails, restore fails | [`BackplaneError::RollbackFailed`], old file at the backup path |
/// | backup removal fails | [`BackplaneError::CleanupFailed`], new file in place |
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSafeWriter;

impl FsSafeWriter {
    /// Create a new filesystem writer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run the backup/write/rollback/cleanup sequence around `write`.
    async fn replace_with<F, Fut>(&self, path: &Path, write: F) -> Result<(), BackplaneError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let backup = BackupManager::new(path.to_path_buf());

        let exists = match fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => {
                return Err(BackplaneError::NotAFile {
                    path: path.to_path_buf(),
                });
            }
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(source) => {
                return Err(BackplaneError::BackupFailed {
                    path: path.to_path_buf(),
                    backup: backup.backup_path().to_path_buf(),
                    source,
                });
            }
        };

        if !exists {
            debug!("{:?} does not exist, writing without backup", path);
            return write().await.map_err(|source| BackplaneError::WriteFailed {
                path: path.to_path_buf(),
                source,
            });
        }

        backup.create_backup().await?;

        if let Err(write_error) = write().await {
            error!("Failed to write {:?}: {}", path, write_error);
            return match backup.restore_backup().await {
                Ok(()) => Err(BackplaneError::WriteFailed {
                    path: path.to_path_buf(),
                    source: write_error,
                }),
                Err(restore_error) => {
                    error!(
                        "Failed to restore {:?} from {:?}: {}",
                        path,
                        backup.backup_path(),
                        restore_error
                    );
                    Err(BackplaneError::RollbackFailed {
                        path: path.to_path_buf(),
                        backup: backup.backup_path().to_path_buf(),
                        write_error,
                        source: restore_error,
                    })
                }
            };
        }

        info!("Wrote new binary to {:?}", path);
        backup.cleanup_backup().await
    }
}

impl SafeWriter for FsSafeWriter {
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), BackplaneError> {
        self.replace_with(path, || write_executable(path, data)).await
    }
}

/// Create (or truncate) `path`, write `data`, mark it executable and sync it.
async fn write_executable(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o755);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;

    // The creation mode is filtered by the umask
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}
