//! The `upgrade` command.
//!
//! Wires the GitHub release feed and the filesystem writer into a
//! [`SelfUpdater`] bound to the process's stdin and stdout, with Ctrl-C
//! cancelling any in-flight request or the confirmation prompt.

use crate::upgrade::{FsSafeWriter, GitHubReleaseSource, ReleaseSource, SelfUpdater, UpgradeConfig};
use anyhow::{Context, Result};
use clap::Args;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Upgrade `ocm-backplane` to the latest release.
#[derive(Args, Debug, Default)]
pub struct UpgradeCommand {}

impl UpgradeCommand {
    /// Run the upgrade against the feed described by `config`.
    pub async fn execute(self, config: UpgradeConfig) -> Result<()> {
        let source = GitHubReleaseSource::new(&config)?;
        source
            .check_connection()
            .await
            .with_context(|| format!("Failed to check for updates of {}", config.repository()))?;

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupted, cancelling upgrade");
                    cancel.cancel();
                }
            })
        };

        let updater =
            SelfUpdater::new(source, FsSafeWriter::new(), config).with_cancellation(cancel);

        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();
        let result = updater.upgrade(env!("CARGO_PKG_VERSION"), &mut stdin, &mut stdout).await;
        interrupt.abort();

        let outcome = result?;
        debug!("Upgrade finished: {:?}", outcome);
        Ok(())
    }
}
