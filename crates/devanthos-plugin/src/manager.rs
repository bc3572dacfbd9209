//! Plugin manager: loading, discovery, hook execution and removal.
//!
//! Nothing here fails the host. Load and discovery problems become
//! diagnostics and the affected plugin is simply absent; hook failures are
//! contained by the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::diagnostics::{DiagnosticCallback, Diagnostics};
use crate::discovery::{self, DiscoveryPaths};
use crate::error::{PluginError, PluginResult};
use crate::exports::PluginExport;
use crate::hooks::context::HookContext;
use crate::hooks::definitions::LifecyclePoint;
use crate::hooks::dispatcher::{HookDispatcher, HookReport};
use crate::hooks::registry::HookRegistry;
use crate::loader::{BuiltinLoader, ManifestLoader, PluginLoader, PluginSource};
use crate::registry::{PluginDescriptor, PluginInfo, PluginOrigin, PluginRegistry};

/// Settings for a [`PluginManager`].
#[derive(Clone, Default)]
pub struct PluginManagerConfig {
    /// Log load and discovery diagnostics at `warn` instead of `debug`.
    pub verbose: bool,
    /// Locations scanned by [`PluginManager::discover_plugins`] before caller paths.
    pub discovery: DiscoveryPaths,
    /// Receives every contained failure.
    pub callback: Option<DiagnosticCallback>,
}

impl std::fmt::Debug for PluginManagerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManagerConfig")
            .field("verbose", &self.verbose)
            .field("discovery", &self.discovery)
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl PluginManagerConfig {
    /// Configuration without default discovery locations.
    pub fn isolated() -> Self {
        Self {
            discovery: DiscoveryPaths::none(),
            ..Default::default()
        }
    }
}

/// Owns the plugin registry, the hook bindings and the loaders.
#[derive(Debug)]
pub struct PluginManager {
    /// Plugin registry.
    plugin_registry: Arc<PluginRegistry>,
    /// Hook registry.
    hook_registry: Arc<HookRegistry>,
    /// Hook dispatcher.
    hook_dispatcher: Arc<HookDispatcher>,
    /// Loaders tried in order.
    loaders: Vec<Arc<dyn PluginLoader>>,
    /// Builtin plugin sources.
    builtins: Vec<PluginSource>,
    /// Default discovery locations.
    discovery: DiscoveryPaths,
    /// Failure reporting.
    diagnostics: Diagnostics,
}

impl PluginManager {
    /// Creates a manager that loads manifest files.
    pub fn new(config: PluginManagerConfig) -> Self {
        let mut diagnostics = Diagnostics::new(config.verbose);
        if let Some(callback) = config.callback {
            diagnostics = diagnostics.with_callback(callback);
        }

        let hook_registry = Arc::new(HookRegistry::new());
        let hook_dispatcher = Arc::new(HookDispatcher::new(
            hook_registry.clone(),
            diagnostics.clone(),
        ));

        let manifests: Arc<dyn PluginLoader> = Arc::new(ManifestLoader);

        Self {
            plugin_registry: Arc::new(PluginRegistry::new()),
            hook_registry,
            hook_dispatcher,
            loaders: vec![manifests],
            builtins: Vec::new(),
            discovery: config.discovery,
            diagnostics,
        }
    }

    /// Adds a loader, tried after the existing ones.
    pub fn with_loader(mut self, loader: Arc<dyn PluginLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Makes compiled-in plugins loadable through `builtin:<name>` sources.
    pub fn with_builtins(mut self, builtins: BuiltinLoader) -> Self {
        self.builtins.extend(builtins.sources());
        self.with_loader(Arc::new(builtins))
    }

    /// Loads a plugin, returning `None` and reporting a diagnostic on failure.
    ///
    /// On failure nothing is registered and existing plugins are untouched.
    pub async fn load_plugin(
        &self,
        source: impl Into<PluginSource>,
    ) -> Option<Arc<PluginDescriptor>> {
        match self.try_load_plugin(source).await {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                self.diagnostics.report(&err);
                None
            }
        }
    }

    /// Loads a plugin, returning the error instead of reporting it.
    pub async fn try_load_plugin(
        &self,
        source: impl Into<PluginSource>,
    ) -> PluginResult<Arc<PluginDescriptor>> {
        let source = source.into();
        let export = self.resolve(&source).await?;
        self.load_export(export, source.origin()).await
    }

    /// Validates and registers an export produced by host code.
    pub async fn load_export(
        &self,
        export: PluginExport,
        origin: PluginOrigin,
    ) -> PluginResult<Arc<PluginDescriptor>> {
        let descriptor = export.into_descriptor(origin)?;
        Ok(self.register(descriptor).await)
    }

    /// Parses and validates a plugin without registering it.
    pub async fn check_plugin(
        &self,
        source: impl Into<PluginSource>,
    ) -> PluginResult<PluginInfo> {
        let source = source.into();
        let export = self.resolve(&source).await?;
        Ok(export.into_descriptor(source.origin())?.info())
    }

    async fn resolve(&self, source: &PluginSource) -> PluginResult<PluginExport> {
        let loader = self
            .loaders
            .iter()
            .find(|loader| loader.supports(source))
            .ok_or_else(|| PluginError::load(source.to_string(), "no loader for this source"))?;
        loader.load(source).await
    }

    async fn register(&self, descriptor: PluginDescriptor) -> Arc<PluginDescriptor> {
        let descriptor = Arc::new(descriptor);

        self.plugin_registry.insert(descriptor.clone()).await;
        self.hook_registry
            .replace_plugin(&descriptor.name, descriptor.bindings())
            .await;

        info!(
            plugin = %descriptor.name,
            version = %descriptor.version,
            priority = descriptor.effective_priority(),
            hooks = descriptor.hooks.len(),
            "Plugin loaded"
        );
        descriptor
    }

    /// Loads every builtin registered through [`PluginManager::with_builtins`].
    pub async fn load_builtins(&self) -> usize {
        let mut loaded = 0;
        for source in &self.builtins {
            if self.load_plugin(source.clone()).await.is_some() {
                loaded += 1;
            }
        }
        loaded
    }

    /// Scans the default locations, then `extra_paths`, loading every manifest found.
    ///
    /// Missing paths are skipped. Returns the number of registered plugins afterwards.
    pub async fn discover_plugins(&self, extra_paths: &[PathBuf]) -> usize {
        let search: Vec<PathBuf> = self
            .discovery
            .paths()
            .iter()
            .chain(extra_paths.iter())
            .cloned()
            .collect();

        for path in &search {
            let files = match discovery::scan_path(path).await {
                Ok(files) => files,
                Err(err) => {
                    self.diagnostics.report(&err);
                    continue;
                }
            };
            for file in files {
                self.load_plugin(file).await;
            }
        }

        let count = self.plugin_registry.count().await;
        debug!(paths = search.len(), plugins = count, "Plugin discovery finished");
        count
    }

    /// Runs every handler bound to `point` and returns the resulting context.
    pub async fn execute_hook(&self, point: LifecyclePoint, context: HookContext) -> HookContext {
        self.hook_dispatcher.execute(point, context).await
    }

    /// Like [`PluginManager::execute_hook`], also reporting per-handler outcomes.
    pub async fn execute_hook_with_report(
        &self,
        point: LifecyclePoint,
        context: HookContext,
    ) -> HookReport {
        self.hook_dispatcher.execute_with_report(point, context).await
    }

    /// Summaries of every registered plugin in registration order.
    pub async fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugin_registry.list().await
    }

    /// Looks up a registered plugin.
    pub async fn get_plugin(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.plugin_registry.get(name).await
    }

    /// Removes a plugin and all of its hook bindings.
    ///
    /// Returns `false` when no plugin with that name is registered.
    pub async fn disable_plugin(&self, name: &str) -> bool {
        if self.plugin_registry.remove(name).await.is_none() {
            return false;
        }
        let removed = self.hook_registry.unregister_plugin(name).await;
        info!(plugin = %name, bindings = removed, "Plugin disabled");
        true
    }

    /// Number of registered plugins.
    pub async fn plugin_count(&self) -> usize {
        self.plugin_registry.count().await
    }

    /// Plugin names bound to `point`, in execution order.
    pub async fn hook_order(&self, point: LifecyclePoint) -> Vec<String> {
        self.hook_registry.plugin_names(point).await
    }

    /// Returns the hook dispatcher.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.hook_dispatcher
    }

    /// Returns the diagnostics sink.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(PluginManagerConfig::default())
    }
}
