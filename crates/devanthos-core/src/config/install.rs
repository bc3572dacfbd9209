//! Dependency installation configuration.

use serde::{Deserialize, Serialize};

/// Package-manager execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Maximum time a single package-manager run may take, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    300
}
