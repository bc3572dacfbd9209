//! Update-check commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use crate::output::{self, OutputFormat};
use devanthos_core::config::AppConfig;
use devanthos_core::error::AppError;
use devanthos_scaffold::{UpdateChecker, UpdateStatus};

/// Running CLI version.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Arguments for update commands
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Update subcommand
    #[command(subcommand)]
    pub command: UpdateCommand,
}

/// Update subcommands
#[derive(Debug, Subcommand)]
pub enum UpdateCommand {
    /// Compare the running version with the latest release
    Check {
        /// Ignore the check interval
        #[arg(long)]
        force: bool,
    },
    /// Forget when the last check ran
    ClearCache,
}

#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Update available")]
    update_available: bool,
}

impl From<UpdateStatus> for StatusRow {
    fn from(status: UpdateStatus) -> Self {
        Self {
            current: status.current,
            latest: status.latest,
            update_available: status.update_available,
        }
    }
}

/// Execute update commands
pub async fn execute(
    args: &UpdateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let checker = UpdateChecker::new(config.update.clone(), CURRENT_VERSION)?;

    match &args.command {
        UpdateCommand::Check { force } => match checker.check(*force).await? {
            Some(status) => {
                let available = status.update_available;
                let latest = status.latest.clone();
                output::print_item(&StatusRow::from(status), format);
                if available {
                    print_upgrade_hint(&config.update.package, &latest);
                }
            }
            None => {
                output::print_success("Checked recently; use --force to check again");
            }
        },
        UpdateCommand::ClearCache => {
            if checker.clear_cache().await? {
                output::print_success("Update-check cache cleared");
            } else {
                output::print_success("No update-check cache to clear");
            }
        }
    }

    Ok(())
}

/// Background check run by `new`. Never fails the caller.
pub async fn notify_if_outdated(config: &AppConfig) {
    if config.no_update_check {
        return;
    }
    let checker = match UpdateChecker::new(config.update.clone(), CURRENT_VERSION) {
        Ok(checker) => checker,
        Err(e) => {
            debug!(error = %e, "Update check unavailable");
            return;
        }
    };
    match checker.check(false).await {
        Ok(Some(status)) if status.update_available => {
            print_upgrade_hint(&config.update.package, &status.latest);
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "Update check failed"),
    }
}

fn print_upgrade_hint(package: &str, latest: &str) {
    output::print_warning(&format!(
        "A new version is available: {} -> {}",
        CURRENT_VERSION, latest
    ));
    output::print_kv("Upgrade", &format!("npm install -g {}@latest", package));
}
