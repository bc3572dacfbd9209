//! Shared helpers for plugin engine integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use devanthos_plugin::prelude::*;

/// Test harness: an isolated manager plus every diagnostic it reported.
pub struct TestEngine {
    /// The manager under test.
    pub manager: PluginManager,
    /// Display strings of every reported diagnostic.
    pub diagnostics: Arc<Mutex<Vec<String>>>,
}

impl TestEngine {
    /// Manager without default discovery locations.
    pub fn new() -> Self {
        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let sink = diagnostics.clone();
        let config = PluginManagerConfig {
            callback: Some(Arc::new(move |err: &PluginError| {
                sink.lock().unwrap().push(err.to_string());
            })),
            ..PluginManagerConfig::isolated()
        };

        Self {
            manager: PluginManager::new(config),
            diagnostics,
        }
    }

    /// Registers an inline plugin whose `afterClone` returns `patch`.
    pub async fn patcher(&self, name: &str, priority: Option<i32>, patch: Value) {
        let mut export = PluginExport::new(name).on(
            LifecyclePoint::AfterClone,
            Arc::new(StaticPatch::new(patch)),
        );
        export.priority = priority;
        self.manager
            .load_export(export, PluginOrigin::Inline)
            .await
            .unwrap();
    }

    /// Registers an inline plugin whose `afterClone` always fails.
    pub async fn failing(&self, name: &str, priority: i32) {
        let export = PluginExport::new(name)
            .priority(priority)
            .on_fn(LifecyclePoint::AfterClone, |_ctx| async {
                Err::<Option<Value>, _>(anyhow::anyhow!("plugin exploded"))
            });
        self.manager
            .load_export(export, PluginOrigin::Inline)
            .await
            .unwrap();
    }

    /// Snapshot of reported diagnostics.
    pub fn reported(&self) -> Vec<String> {
        self.diagnostics.lock().unwrap().clone()
    }
}

/// Writes a manifest file and returns its path.
pub fn write_manifest(dir: &Path, file_name: &str, body: &str) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, body).unwrap();
    path
}
