//! Plugin exports: the unvalidated shape a loader produces.
//!
//! [`PluginExport::into_descriptor`] is the single validation point. Every
//! loader goes through it, so manifest plugins, builtin plugins and plugins
//! registered by host code obey the same rules.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::hooks::context::HookContext;
use crate::hooks::definitions::{HookHandler, LifecyclePoint};
use crate::registry::{DEFAULT_VERSION, PluginDescriptor, PluginOrigin};
use crate::traits::ClosureHandler;

/// A value exported under a hook key.
#[derive(Debug, Clone)]
pub enum HookExport {
    /// A callable handler.
    Handler(Arc<dyn HookHandler>),
    /// Something that cannot be invoked. Holds a short description of what it was.
    NotCallable(String),
}

/// A candidate plugin as produced by a loader.
#[derive(Debug, Clone, Default)]
pub struct PluginExport {
    /// Plugin name. Required.
    pub name: Option<String>,
    /// Plugin version.
    pub version: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Author.
    pub author: Option<String>,
    /// Declared priority.
    pub priority: Option<i32>,
    /// Exported hook keys, in declaration order.
    pub hooks: Vec<(String, HookExport)>,
}

impl PluginExport {
    /// Creates an export with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Sets the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the priority (lower runs earlier).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Exports a handler for a lifecycle point.
    pub fn on(self, point: LifecyclePoint, handler: Arc<dyn HookHandler>) -> Self {
        self.on_key(point.as_str(), HookExport::Handler(handler))
    }

    /// Exports a closure for a lifecycle point.
    pub fn on_fn<F, Fut>(self, point: LifecyclePoint, handler: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        let label = format!("{}:{}", self.name.as_deref().unwrap_or("?"), point);
        self.on(point, ClosureHandler::wrap(&label, handler))
    }

    /// Exports an arbitrary value under a raw key.
    pub fn on_key(mut self, key: impl Into<String>, export: HookExport) -> Self {
        self.hooks.push((key.into(), export));
        self
    }

    /// Validates the export and turns it into a registrable descriptor.
    ///
    /// Fails when the name is missing or blank, when a key naming a
    /// lifecycle point is not callable, or when two keys name the same point
    /// (`afterClone` and `after_clone`). Unknown keys are dropped. The name is
    /// the registry key exactly as given.
    pub fn into_descriptor(self, origin: PluginOrigin) -> PluginResult<PluginDescriptor> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(PluginError::invalid(origin.to_string(), "missing plugin name")),
        };

        let mut hooks = BTreeMap::new();
        for (key, export) in self.hooks {
            let Some(point) = LifecyclePoint::from_key(&key) else {
                debug!(plugin = %name, key = %key, "Ignoring unknown hook key");
                continue;
            };
            match export {
                HookExport::Handler(_) if hooks.contains_key(&point) => {
                    return Err(PluginError::invalid(
                        origin.to_string(),
                        format!("plugin '{name}' declares hook '{point}' more than once"),
                    ));
                }
                HookExport::Handler(handler) => {
                    hooks.insert(point, handler);
                }
                HookExport::NotCallable(what) => {
                    return Err(PluginError::invalid(
                        origin.to_string(),
                        format!("hook '{key}' of plugin '{name}' is not callable ({what})"),
                    ));
                }
            }
        }

        Ok(PluginDescriptor {
            name,
            version: self
                .version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            description: self.description,
            author: self.author,
            priority: self.priority,
            hooks,
            origin,
        })
    }
}
