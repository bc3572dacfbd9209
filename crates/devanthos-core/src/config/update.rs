//! Self update-check configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the periodic "is there a newer release" check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Package name published to the registry.
    #[serde(default = "default_package")]
    pub package: String,
    /// Base URL of the package registry.
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// Minimum hours between two automatic checks.
    #[serde(default = "default_interval")]
    pub check_interval_hours: u64,
    /// Registry request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Override for the cache file recording the last check.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

impl UpdateConfig {
    /// Resolved cache file path (`~/.devanthos/cache/last-update-check.json` by default).
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_file.clone().or_else(|| {
            super::devanthos_home().map(|home| home.join("cache").join("last-update-check.json"))
        })
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            package: default_package(),
            registry_url: default_registry_url(),
            check_interval_hours: default_interval(),
            timeout_seconds: default_timeout(),
            cache_file: None,
        }
    }
}

fn default_package() -> String {
    "create-devanthos-app".to_string()
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_interval() -> u64 {
    24
}

fn default_timeout() -> u64 {
    5
}
