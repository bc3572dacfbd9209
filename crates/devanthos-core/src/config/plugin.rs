//! Plugin system configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Plugin discovery and loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Whether plugins are discovered and hooks executed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the bundled plugins are registered.
    #[serde(default = "default_true")]
    pub builtins: bool,
    /// Project-local single plugin manifest.
    #[serde(default = "default_project_manifest")]
    pub project_manifest: PathBuf,
    /// Project-local plugin directory.
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,
    /// User plugin directory. Defaults to `~/.devanthos/plugins`.
    #[serde(default)]
    pub user_dir: Option<PathBuf>,
    /// Additional files or directories scanned after the defaults.
    #[serde(default)]
    pub extra_paths: Vec<PathBuf>,
    /// Plugin names disabled after discovery.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl PluginConfig {
    /// Resolved user plugin directory.
    pub fn user_plugin_dir(&self) -> Option<PathBuf> {
        self.user_dir
            .clone()
            .or_else(|| super::devanthos_home().map(|home| home.join("plugins")))
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            builtins: true,
            project_manifest: default_project_manifest(),
            project_dir: default_project_dir(),
            user_dir: None,
            extra_paths: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

fn default_project_manifest() -> PathBuf {
    PathBuf::from("devanthos.plugins.toml")
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".devanthos").join("plugins")
}

fn default_true() -> bool {
    true
}
