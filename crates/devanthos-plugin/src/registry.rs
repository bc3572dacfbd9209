//! Plugin registry: loaded plugin descriptors keyed by unique name.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::hooks::definitions::{HookBinding, HookHandler, LifecyclePoint};

/// Priority used when a plugin does not declare one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Version recorded when a plugin does not declare one.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Where a plugin was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PluginOrigin {
    /// Compiled into the host (`builtin:<name>`).
    Builtin(String),
    /// A manifest file on disk.
    Manifest(PathBuf),
    /// Registered directly by host code.
    Inline,
}

impl std::fmt::Display for PluginOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin(name) => write!(f, "builtin:{name}"),
            Self::Manifest(path) => write!(f, "{}", path.display()),
            Self::Inline => write!(f, "inline"),
        }
    }
}

/// A validated, registered plugin.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Unique plugin name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional author.
    pub author: Option<String>,
    /// Declared priority, if any.
    pub priority: Option<i32>,
    /// Hook implementations keyed by lifecycle point.
    pub hooks: BTreeMap<LifecyclePoint, Arc<dyn HookHandler>>,
    /// Where the plugin came from.
    pub origin: PluginOrigin,
}

impl PluginDescriptor {
    /// Priority used for ordering this plugin's handlers.
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Lifecycle points this plugin implements, in workflow order.
    pub fn hook_points(&self) -> Vec<LifecyclePoint> {
        self.hooks.keys().copied().collect()
    }

    /// Builds the hook bindings for this plugin.
    pub fn bindings(&self) -> Vec<(LifecyclePoint, HookBinding)> {
        let priority = self.effective_priority();
        self.hooks
            .iter()
            .map(|(point, handler)| {
                (
                    *point,
                    HookBinding::new(self.name.clone(), handler.clone(), priority),
                )
            })
            .collect()
    }

    /// Display summary with placeholders for missing fields.
    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| "No description".to_string()),
            author: self.author.clone().unwrap_or_else(|| "Unknown".to_string()),
            priority: self.effective_priority(),
            hooks: self.hook_points(),
            origin: self.origin.to_string(),
        }
    }
}

/// Display summary of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Description or `"No description"`.
    pub description: String,
    /// Author or `"Unknown"`.
    pub author: String,
    /// Effective priority.
    pub priority: i32,
    /// Implemented lifecycle points.
    pub hooks: Vec<LifecyclePoint>,
    /// Source the plugin was loaded from.
    pub origin: String,
}

/// Registry of loaded plugins.
///
/// Entries keep insertion order. Re-inserting an existing name replaces the
/// descriptor in place.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<PluginDescriptor>>>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// Inserts a descriptor, returning the one it replaced.
    pub async fn insert(
        &self,
        descriptor: impl Into<Arc<PluginDescriptor>>,
    ) -> Option<Arc<PluginDescriptor>> {
        let mut plugins = self.plugins.write().await;
        let descriptor = descriptor.into();

        if let Some(slot) = plugins.iter_mut().find(|p| p.name == descriptor.name) {
            info!(
                plugin = %descriptor.name,
                version = %descriptor.version,
                "Replacing plugin"
            );
            return Some(std::mem::replace(slot, descriptor));
        }

        debug!(
            plugin = %descriptor.name,
            version = %descriptor.version,
            origin = %descriptor.origin,
            "Registering plugin"
        );
        plugins.push(descriptor);
        None
    }

    /// Removes a plugin by name.
    pub async fn remove(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        let mut plugins = self.plugins.write().await;
        let index = plugins.iter().position(|p| p.name == name)?;
        Some(plugins.remove(index))
    }

    /// Gets a plugin by name.
    pub async fn get(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        let plugins = self.plugins.read().await;
        plugins.iter().find(|p| p.name == name).cloned()
    }

    /// Summaries of every plugin in insertion order.
    pub async fn list(&self) -> Vec<PluginInfo> {
        let plugins = self.plugins.read().await;
        plugins.iter().map(|p| p.info()).collect()
    }

    /// Returns plugin count.
    pub async fn count(&self) -> usize {
        let plugins = self.plugins.read().await;
        plugins.len()
    }

    /// Checks whether a plugin is registered.
    pub async fn contains(&self, name: &str) -> bool {
        let plugins = self.plugins.read().await;
        plugins.iter().any(|p| p.name == name)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
