//! Hook registry: per lifecycle point, the handlers bound by each plugin in priority order.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;
use tracing::debug;

use super::definitions::{HookBinding, LifecyclePoint};

/// Registry of hook bindings organized by lifecycle point.
///
/// Every list is kept sorted ascending by priority. The sort is stable,
/// so bindings with equal priority run in registration order.
#[derive(Debug)]
pub struct HookRegistry {
    /// Lifecycle point → sorted bindings.
    bindings: RwLock<HashMap<LifecyclePoint, Vec<HookBinding>>>,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Binds a single handler to a lifecycle point.
    pub async fn register(&self, point: LifecyclePoint, binding: HookBinding) {
        let mut bindings = self.bindings.write().await;
        debug!(
            point = %point,
            plugin = %binding.plugin_name,
            priority = binding.priority,
            "Hook bound"
        );
        let entries = bindings.entry(point).or_default();
        entries.push(binding);
        entries.sort_by_key(|b| b.priority);
    }

    /// Replaces every binding owned by `plugin_name` with `new_bindings`.
    ///
    /// Old bindings are removed from all points, then the new ones are
    /// appended and each affected point is re-sorted. Runs under one write
    /// lock so readers never observe a half-replaced plugin.
    pub async fn replace_plugin(
        &self,
        plugin_name: &str,
        new_bindings: Vec<(LifecyclePoint, HookBinding)>,
    ) {
        let mut bindings = self.bindings.write().await;
        let mut affected = BTreeSet::new();

        for (point, entries) in bindings.iter_mut() {
            let before = entries.len();
            entries.retain(|b| b.plugin_name != plugin_name);
            if entries.len() != before {
                affected.insert(*point);
            }
        }

        for (point, binding) in new_bindings {
            bindings.entry(point).or_default().push(binding);
            affected.insert(point);
        }

        for point in &affected {
            if let Some(entries) = bindings.get_mut(point) {
                entries.sort_by_key(|b| b.priority);
            }
        }

        bindings.retain(|_, entries| !entries.is_empty());

        debug!(plugin = %plugin_name, points = affected.len(), "Plugin hooks registered");
    }

    /// Removes every binding owned by `plugin_name`. Returns how many were removed.
    pub async fn unregister_plugin(&self, plugin_name: &str) -> usize {
        let mut bindings = self.bindings.write().await;
        let mut removed = 0;

        for entries in bindings.values_mut() {
            let before = entries.len();
            entries.retain(|b| b.plugin_name != plugin_name);
            removed += before - entries.len();
        }

        bindings.retain(|_, entries| !entries.is_empty());

        debug!(plugin = %plugin_name, removed, "Plugin hooks unregistered");
        removed
    }

    /// Snapshot of the bindings for a point, in execution order.
    pub async fn bindings(&self, point: LifecyclePoint) -> Vec<HookBinding> {
        let bindings = self.bindings.read().await;
        bindings.get(&point).cloned().unwrap_or_default()
    }

    /// Plugin names bound to a point, in execution order.
    pub async fn plugin_names(&self, point: LifecyclePoint) -> Vec<String> {
        let bindings = self.bindings.read().await;
        bindings
            .get(&point)
            .map(|entries| entries.iter().map(|b| b.plugin_name.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns whether any handlers are bound to a point.
    pub async fn has_bindings(&self, point: LifecyclePoint) -> bool {
        let bindings = self.bindings.read().await;
        bindings
            .get(&point)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Returns the number of handlers bound to a point.
    pub async fn binding_count(&self, point: LifecyclePoint) -> usize {
        let bindings = self.bindings.read().await;
        bindings.get(&point).map(Vec::len).unwrap_or(0)
    }

    /// Returns whether `plugin_name` owns a binding on any point.
    pub async fn is_bound(&self, plugin_name: &str) -> bool {
        let bindings = self.bindings.read().await;
        bindings
            .values()
            .any(|entries| entries.iter().any(|b| b.plugin_name == plugin_name))
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
