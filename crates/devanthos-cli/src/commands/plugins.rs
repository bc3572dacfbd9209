//! Plugin inspection commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use devanthos_core::config::AppConfig;
use devanthos_core::error::AppError;
use devanthos_plugin::{PluginInfo, PluginSource};

/// Arguments for plugin commands
#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Plugin subcommand
    #[command(subcommand)]
    pub command: PluginsCommand,
}

/// Plugin subcommands
#[derive(Debug, Subcommand)]
pub enum PluginsCommand {
    /// List every plugin that would run
    List {
        /// Additional manifest file or directory to scan
        #[arg(short, long = "plugin-path")]
        plugin_path: Vec<PathBuf>,
    },
    /// Load and validate a plugin without registering it
    Check {
        /// Manifest path or `builtin:<name>`
        source: String,
    },
}

/// Table row for a plugin.
#[derive(Debug, Serialize, Tabled)]
pub struct PluginRow {
    /// Plugin name
    #[tabled(rename = "Name")]
    pub name: String,
    /// Plugin version
    #[tabled(rename = "Version")]
    pub version: String,
    /// Effective priority
    #[tabled(rename = "Priority")]
    pub priority: i32,
    /// Implemented hooks
    #[tabled(rename = "Hooks")]
    pub hooks: String,
    /// Author
    #[tabled(rename = "Author")]
    pub author: String,
    /// Loaded from
    #[tabled(rename = "Source")]
    pub origin: String,
}

impl From<PluginInfo> for PluginRow {
    fn from(info: PluginInfo) -> Self {
        let hooks: Vec<&str> = info.hooks.iter().map(|p| p.as_str()).collect();
        Self {
            name: info.name,
            version: info.version,
            priority: info.priority,
            hooks: if hooks.is_empty() {
                "-".to_string()
            } else {
                hooks.join(", ")
            },
            author: info.author,
            origin: info.origin,
        }
    }
}

/// Execute plugin commands
pub async fn execute(
    args: &PluginsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        PluginsCommand::List { plugin_path } => {
            let manager = super::plugin_manager(config, plugin_path).await?;
            let rows: Vec<PluginRow> = manager
                .list_plugins()
                .await
                .into_iter()
                .map(PluginRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        PluginsCommand::Check { source } => {
            let manager = super::plugin_manager(config, &[]).await?;
            let source = PluginSource::parse(source);
            match manager.check_plugin(source.clone()).await {
                Ok(info) => {
                    output::print_success(&format!("Plugin '{}' is valid", info.name));
                    output::print_kv("Description", &info.description);
                    output::print_item(&PluginRow::from(info), format);
                }
                Err(e) => {
                    output::print_error(&format!("Plugin {} is invalid: {}", source, e));
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
