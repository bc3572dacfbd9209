//! TOML plugin manifests.
//!
//! ```toml
//! name = "tagger"
//! priority = 10
//!
//! [env]
//! TAG = "A"
//!
//! [hooks]
//! afterClone = "./tag.sh"
//! afterInstall = { command = "./audit.sh", timeout = 30 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::command::CommandHookHandler;
use crate::error::{PluginError, PluginResult};
use crate::exports::{HookExport, PluginExport};

/// File suffix recognised as a plugin manifest.
pub const MANIFEST_SUFFIX: &str = ".toml";

#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<String>,
    priority: Option<i32>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    hooks: toml::Table,
}

/// Parses manifest text. `path` locates the manifest; hook commands run in its directory.
pub fn parse_manifest(text: &str, path: &Path) -> PluginResult<PluginExport> {
    let raw: RawManifest = toml::from_str(text).map_err(|e| {
        PluginError::load(path.display().to_string(), format!("invalid manifest: {e}"))
    })?;

    let plugin_name = raw.name.clone().unwrap_or_default();
    let working_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf);

    let mut export = PluginExport {
        name: raw.name,
        version: raw.version,
        description: raw.description,
        author: raw.author,
        priority: raw.priority,
        hooks: Vec::new(),
    };

    for (key, value) in raw.hooks {
        let hook = match hook_command(&value) {
            Ok((command, timeout)) => {
                let mut handler = CommandHookHandler::new(plugin_name.clone(), command)
                    .envs(raw.env.clone())
                    .timeout(timeout);
                if let Some(dir) = &working_dir {
                    handler = handler.working_dir(dir);
                }
                HookExport::Handler(Arc::new(handler))
            }
            Err(what) => HookExport::NotCallable(what),
        };
        export = export.on_key(key, hook);
    }

    Ok(export)
}

/// Reads and parses a manifest file.
pub async fn read_manifest(path: &Path) -> PluginResult<PluginExport> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PluginError::load(path.display().to_string(), e.to_string()))?;
    parse_manifest(&text, path)
}

/// Extracts `(command, timeout)` from a hook value, or describes why it is not callable.
fn hook_command(value: &toml::Value) -> Result<(String, Option<Duration>), String> {
    match value {
        toml::Value::String(command) if !command.trim().is_empty() => {
            Ok((command.clone(), None))
        }
        toml::Value::Table(table) => {
            let command = match table.get("command") {
                Some(toml::Value::String(command)) if !command.trim().is_empty() => command.clone(),
                _ => return Err("table without a command string".to_string()),
            };
            let timeout = match table.get("timeout") {
                None => None,
                Some(toml::Value::Integer(secs)) if *secs > 0 => {
                    Some(Duration::from_secs(*secs as u64))
                }
                Some(_) => return Err("timeout must be a positive integer".to_string()),
            };
            Ok((command, timeout))
        }
        toml::Value::String(_) => Err("empty command".to_string()),
        other => Err(other.type_str().to_string()),
    }
}
