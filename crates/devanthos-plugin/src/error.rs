//! Plugin engine error taxonomy.
//!
//! None of these errors are fatal to the host: loading and discovery
//! degrade to "plugin not loaded", hook failures to "handler skipped".

use std::path::PathBuf;

use thiserror::Error;

use devanthos_core::error::AppError;

use crate::hooks::definitions::LifecyclePoint;

/// Errors raised while loading, discovering, or running plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin export is structurally invalid.
    #[error("invalid plugin {origin}: {reason}")]
    InvalidPlugin {
        /// Where the plugin came from.
        origin: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The plugin source could not be resolved or read.
    #[error("failed to load plugin {origin}: {reason}")]
    Load {
        /// Where the plugin came from.
        origin: String,
        /// Underlying failure.
        reason: String,
    },

    /// A hook handler returned an error or panicked.
    #[error("hook {point} of plugin '{plugin}' failed: {message}")]
    HookExecution {
        /// Lifecycle point being executed.
        point: LifecyclePoint,
        /// Plugin owning the handler.
        plugin: String,
        /// Failure message.
        message: String,
    },

    /// A search path existed but could not be listed.
    #[error("failed to read plugin directory {}: {}", .path.display(), .source)]
    DiscoveryIo {
        /// The directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    /// Creates an invalid-plugin error.
    pub fn invalid(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPlugin {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Creates a load error.
    pub fn load(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Creates a hook-execution error.
    pub fn hook(point: LifecyclePoint, plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookExecution {
            point,
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Plugin name the error refers to, when known.
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::HookExecution { plugin, .. } => Some(plugin),
            _ => None,
        }
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        AppError::plugin(err.to_string())
    }
}

/// Result alias for plugin engine operations.
pub type PluginResult<T> = Result<T, PluginError>;
