//! Plugins compiled into the CLI.

pub mod dependency_updater;

use std::sync::Arc;
use std::time::Duration;

use devanthos_core::config::AppConfig;
use devanthos_core::result::AppResult;
use devanthos_plugin::BuiltinLoader;

use self::dependency_updater::{DependencyUpdaterSettings, NpmRegistry, VersionLookup};

/// Registry lookups made by bundled plugins give up after this long.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Loader exposing every bundled plugin as `builtin:<name>`.
pub fn builtin_loader(config: &AppConfig) -> AppResult<BuiltinLoader> {
    let settings = DependencyUpdaterSettings {
        update_deps: config.update_deps,
        audit: config.audit,
    };
    let registry: Arc<dyn VersionLookup> =
        Arc::new(NpmRegistry::new(&config.update.registry_url, LOOKUP_TIMEOUT)?);

    Ok(BuiltinLoader::new().register(dependency_updater::PLUGIN_NAME, move || {
        dependency_updater::export(settings, registry.clone())
    }))
}
