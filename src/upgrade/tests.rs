//! Scenario tests for the upgrade orchestrator, using in-memory collaborators.

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::super::*;
    use crate::core::BackplaneError;
    use crate::upgrade::archive::tests::tar_gz;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    /// Release source serving one release and one archive from memory.
    struct FakeSource {
        release: Result<Release, String>,
        archive: Vec<u8>,
        platform: Platform,
        latest_calls: AtomicUsize,
        archive_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(tag: &str, archive: Vec<u8>) -> Self {
            let platform = Platform::new("linux", "amd64");
            let name = asset::asset_name("ocm-backplane", tag, &platform);
            Self {
                release: Ok(Release {
                    tag_name: tag.to_string(),
                    assets: vec![ReleaseAsset {
                        browser_download_url: format!("https://example.com/{name}"),
                        name,
                    }],
                }),
                archive,
                platform,
                latest_calls: AtomicUsize::new(0),
                archive_calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                release: Err(status.to_string()),
                ..Self::new("v0.0.0", Vec::new())
            }
        }

        fn on_platform(mut self, os: &str, arch: &str) -> Self {
            self.platform = Platform::new(os, arch);
            self
        }
    }

    impl ReleaseSource for FakeSource {
        async fn get_latest_release(
            &self,
            _cancel: &CancellationToken,
        ) -> Result<Release, BackplaneError> {
            self.latest_calls.fetch_add(1, Ordering::SeqCst);
            self.release.clone().map_err(|status| BackplaneError::RequestFailed {
                url: "https://example.com/releases/latest".to_string(),
                status: status.parse().unwrap(),
            })
        }

        async fn get_release_archive(
            &self,
            release: &Release,
            _cancel: &CancellationToken,
        ) -> Result<Vec<u8>, BackplaneError> {
            self.archive_calls.fetch_add(1, Ordering::SeqCst);
            match asset::find_asset(release, "ocm-backplane", &self.platform) {
                Some(_) => Ok(self.archive.clone()),
                None => Err(BackplaneError::ArchiveNotFound {
                    asset: asset::asset_name("ocm-backplane", &release.tag_name, &self.platform),
                    os: self.platform.os.clone(),
                    arch: self.platform.arch.clone(),
                }),
            }
        }

        async fn check_connection(&self) -> Result<(), BackplaneError> {
            Ok(())
        }
    }

    /// Writer that records writes instead of touching the filesystem.
    #[derive(Default)]
    struct RecordingWriter {
        writes: Mutex<Vec<(PathBuf, Vec<u8>)>>,
    }

    impl RecordingWriter {
        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl SafeWriter for RecordingWriter {
        async fn write(&self, path: &Path, data: &[u8]) -> Result<(), BackplaneError> {
            self.writes.lock().unwrap().push((path.to_path_buf(), data.to_vec()));
            Ok(())
        }
    }

    fn updater<W: SafeWriter>(source: FakeSource, writer: W) -> SelfUpdater<FakeSource, W> {
        SelfUpdater::new(source, writer, UpgradeConfig::default())
            .with_executable_path(PathBuf::from("/opt/bin/ocm-backplane"))
    }

    async fn run<W: SafeWriter>(
        updater: &SelfUpdater<FakeSource, W>,
        current: &str,
        answer: &str,
    ) -> (anyhow::Result<UpgradeOutcome>, String) {
        let mut input = answer.as_bytes();
        let mut output = Vec::new();
        let result = updater.upgrade(current, &mut input, &mut output).await;
        (result, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_scenario_a_upgrade_replaces_binary() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("ocm-backplane");
        std::fs::write(&exe, b"old binary v0.1.0").unwrap();

        let archive = tar_gz(&[("README.md", b"readme"), ("ocm-backplane", b"new binary v0.2.0")]);
        let updater = SelfUpdater::new(
            FakeSource::new("v0.2.0", archive),
            FsSafeWriter::new(),
            UpgradeConfig::default(),
        )
        .with_executable_path(exe.clone());

        let (result, output) = run(&updater, "0.1.0", "y\n").await;

        assert_eq!(
            result.unwrap(),
            UpgradeOutcome::Upgraded {
                version: "v0.2.0".to_string()
            }
        );
        assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&exe).unwrap(), b"new binary v0.2.0");
        assert!(output.contains("v0.2.0"));
        assert!(output.contains("Successfully upgraded to v0.2.0."));

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("ocm-backplane_"))
            .collect();
        assert!(leftovers.is_empty(), "backup left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_scenario_b_newer_current_is_noop() {
        let updater = updater(FakeSource::new("v0.1.0", Vec::new()), RecordingWriter::default());

        let (result, output) = run(&updater, "0.2.0", "y\n").await;

        assert_eq!(result.unwrap(), UpgradeOutcome::UpToDate);
        assert_eq!(output, "No upgrade available.\n");
        assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 0);
        assert_eq!(updater.writer().write_count(), 0);
    }

    #[tokio::test]
    async fn test_equal_versions_are_noop() {
        for (current, latest) in [("0.2.0", "v0.2.0"), ("v0.2.0", "0.2.0"), ("1.0.0", "v1.0.0-rc.1")] {
            let updater = updater(FakeSource::new(latest, Vec::new()), RecordingWriter::default());

            let (result, output) = run(&updater, current, "y\n").await;

            assert_eq!(result.unwrap(), UpgradeOutcome::UpToDate, "{current} vs {latest}");
            assert!(output.contains("No upgrade available."));
            assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 0);
            assert_eq!(updater.writer().write_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_scenario_c_declined_confirmation() {
        for answer in ["n\n", "\n", "", "yes\n", "nope\n"] {
            let updater = updater(FakeSource::new("v0.2.0", Vec::new()), RecordingWriter::default());

            let (result, output) = run(&updater, "0.1.0", answer).await;

            assert_eq!(result.unwrap(), UpgradeOutcome::Cancelled, "answer {answer:?}");
            assert!(output.contains("v0.2.0"));
            assert!(output.contains("Upgrade cancelled."));
            assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 0);
            assert_eq!(updater.writer().write_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_confirmation_is_case_insensitive() {
        for answer in ["y\n", "Y\n", "  y  \r\n", "Y"] {
            let archive = tar_gz(&[("ocm-backplane", b"new")]);
            let updater = updater(FakeSource::new("v0.2.0", archive), RecordingWriter::default());

            let (result, _) = run(&updater, "0.1.0", answer).await;

            assert!(
                matches!(result.unwrap(), UpgradeOutcome::Upgraded { .. }),
                "answer {answer:?}"
            );
            let writes = updater.writer().writes.lock().unwrap();
            assert_eq!(writes.len(), 1);
            assert_eq!(writes[0].0, PathBuf::from("/opt/bin/ocm-backplane"));
            assert_eq!(writes[0].1, b"new");
        }
    }

    #[tokio::test]
    async fn test_scenario_d_unsupported_platform() {
        let archive = tar_gz(&[("ocm-backplane", b"new")]);
        let source = FakeSource::new("v0.2.0", archive).on_platform("darwin", "arm64");
        let updater = updater(source, RecordingWriter::default());

        let (result, _) = run(&updater, "0.1.0", "y\n").await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackplaneError>(),
            Some(BackplaneError::ArchiveNotFound { .. })
        ));
        let message = format!("{err:#}");
        assert!(message.contains("openshift/backplane-cli"), "{message}");
        assert!(message.contains("v0.2.0"), "{message}");
        assert_eq!(updater.writer().write_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_names_repository() {
        let updater = updater(FakeSource::failing(503), RecordingWriter::default());

        let (result, output) = run(&updater, "0.1.0", "y\n").await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("openshift/backplane-cli"));
        assert!(matches!(
            err.downcast_ref::<BackplaneError>(),
            Some(BackplaneError::RequestFailed { status: 503, .. })
        ));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_versions_are_fatal() {
        for (current, latest) in [("not-a-version", "v0.2.0"), ("0.1.0", "release-2024")] {
            let updater = updater(FakeSource::new(latest, Vec::new()), RecordingWriter::default());

            let (result, output) = run(&updater, current, "y\n").await;

            let err = result.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<BackplaneError>(),
                Some(BackplaneError::InvalidVersion { .. })
            ));
            assert!(output.is_empty(), "no prompt or verdict expected, got {output:?}");
            assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_archive_without_binary() {
        let archive = tar_gz(&[("README.md", b"readme"), ("ocm-backplane-debug", b"debug")]);
        let updater = updater(FakeSource::new("v0.2.0", archive), RecordingWriter::default());

        let (result, output) = run(&updater, "0.1.0", "y\n").await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackplaneError>(),
            Some(BackplaneError::BinaryNotFound { .. })
        ));
        assert!(!output.contains("Successfully"));
        assert_eq!(updater.writer().write_count(), 0);
    }

    #[tokio::test]
    async fn test_writer_errors_propagate_unchanged() {
        struct FailingWriter;

        impl SafeWriter for FailingWriter {
            async fn write(&self, path: &Path, _data: &[u8]) -> Result<(), BackplaneError> {
                Err(BackplaneError::CleanupFailed {
                    backup: path.with_file_name("ocm-backplane_2024.01.01_00:00:00"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                })
            }
        }

        let archive = tar_gz(&[("ocm-backplane", b"new")]);
        let updater = updater(FakeSource::new("v0.2.0", archive), FailingWriter);

        let (result, output) = run(&updater, "0.1.0", "y\n").await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BackplaneError>(),
            Some(BackplaneError::CleanupFailed { .. })
        ));
        // No context layer on top of the writer's error
        assert_eq!(err.chain().count(), 2);
        assert!(err.to_string().starts_with("Upgrade succeeded but the backup"));
        assert!(!output.contains("Successfully"));
    }

    #[tokio::test]
    async fn test_cancelled_prompt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let updater = updater(FakeSource::new("v0.2.0", Vec::new()), RecordingWriter::default())
            .with_cancellation(cancel);

        let (result, _) = run(&updater, "0.1.0", "y\n").await;

        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<BackplaneError>(), Some(BackplaneError::Cancelled)));
        assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_for_update() {
        let updater = updater(FakeSource::new("v0.2.0", Vec::new()), RecordingWriter::default());

        let newer = updater.check_for_update("0.1.0").await.unwrap();
        assert_eq!(newer.map(|r| r.tag_name), Some("v0.2.0".to_string()));

        let none = updater.check_for_update("0.3.0").await.unwrap();
        assert!(none.is_none());

        assert_eq!(updater.source().latest_calls.load(Ordering::SeqCst), 2);
        assert_eq!(updater.source().archive_calls.load(Ordering::SeqCst), 0);
    }
}
