//! CLI command definitions and dispatch.

pub mod new;
pub mod plugins;
pub mod templates;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::output::OutputFormat;
use devanthos_core::config::AppConfig;
use devanthos_core::error::AppError;
use devanthos_plugin::{DiscoveryPaths, PluginManager, PluginManagerConfig};
use devanthos_scaffold::plugins::builtin_loader;

/// Create a new project from a Devanthos template
#[derive(Debug, Parser)]
#[command(name = "create-devanthos", version, about, long_about = None)]
pub struct Cli {
    /// Path to an additional configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Show plugin diagnostics and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to `new`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new project
    New(new::NewArgs),
    /// Inspect plugins
    Plugins(plugins::PluginsArgs),
    /// List available templates
    Templates,
    /// Check for a newer release
    Update(update::UpdateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Some(Commands::New(args)) => new::execute(args, config).await,
            Some(Commands::Plugins(args)) => plugins::execute(args, config, self.format).await,
            Some(Commands::Templates) => templates::execute(config, self.format),
            Some(Commands::Update(args)) => update::execute(args, config, self.format).await,
            None => new::execute(&new::NewArgs::default(), config).await,
        }
    }
}

/// Helper: build the plugin manager with builtins and discovered plugins.
///
/// With plugins disabled the manager is empty and every hook is a no-op.
pub async fn plugin_manager(
    config: &AppConfig,
    extra_paths: &[PathBuf],
) -> Result<Arc<PluginManager>, AppError> {
    if !config.plugins.enabled {
        debug!("Plugins disabled by configuration");
        return Ok(Arc::new(PluginManager::new(PluginManagerConfig::isolated())));
    }

    let mut manager = PluginManager::new(PluginManagerConfig {
        verbose: config.verbose,
        discovery: DiscoveryPaths::from_config(&config.plugins),
        callback: None,
    });
    if config.plugins.builtins {
        manager = manager.with_builtins(builtin_loader(config)?);
    }

    manager.load_builtins().await;
    manager.discover_plugins(extra_paths).await;
    for name in &config.plugins.disabled {
        if !manager.disable_plugin(name).await {
            debug!(plugin = %name, "Disabled plugin was not loaded");
        }
    }

    Ok(Arc::new(manager))
}
