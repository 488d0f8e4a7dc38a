//! `ocm-backplane` CLI entry point
//!
//! Parses the command line, installs logging on stderr, runs the selected
//! command and renders any failure as a user-friendly error block.

use anyhow::Result;
use backplane_cli::cli;
use backplane_cli::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();
    let config = cli.build_config();

    // Logs go to stderr so stdout only carries command output
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute_with_config(config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
