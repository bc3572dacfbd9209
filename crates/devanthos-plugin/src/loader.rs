//! Plugin loaders. Each resolves a [`PluginSource`] into an unvalidated [`PluginExport`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::exports::PluginExport;
use crate::manifest;
use crate::registry::PluginOrigin;

/// Prefix selecting a compiled-in plugin.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Where to load a plugin from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// A manifest file.
    Path(PathBuf),
    /// A compiled-in plugin by name.
    Builtin(String),
}

impl PluginSource {
    /// Parses `builtin:<name>` or a filesystem path.
    pub fn parse(source: &str) -> Self {
        match source.strip_prefix(BUILTIN_PREFIX) {
            Some(name) => Self::Builtin(name.trim().to_string()),
            None => Self::Path(PathBuf::from(source)),
        }
    }

    /// Origin recorded on the descriptor.
    pub fn origin(&self) -> PluginOrigin {
        match self {
            Self::Path(path) => PluginOrigin::Manifest(path.clone()),
            Self::Builtin(name) => PluginOrigin::Builtin(name.clone()),
        }
    }
}

impl std::fmt::Display for PluginSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Builtin(name) => write!(f, "{BUILTIN_PREFIX}{name}"),
        }
    }
}

impl FromStr for PluginSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PluginSource {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl From<PathBuf> for PluginSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for PluginSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Resolves plugin sources of one kind.
#[async_trait]
pub trait PluginLoader: Send + Sync + std::fmt::Debug {
    /// Whether this loader handles `source`.
    fn supports(&self, source: &PluginSource) -> bool;

    /// Produces the plugin export for `source`.
    async fn load(&self, source: &PluginSource) -> PluginResult<PluginExport>;
}

/// Loads TOML plugin manifests from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestLoader;

#[async_trait]
impl PluginLoader for ManifestLoader {
    fn supports(&self, source: &PluginSource) -> bool {
        matches!(source, PluginSource::Path(_))
    }

    async fn load(&self, source: &PluginSource) -> PluginResult<PluginExport> {
        let PluginSource::Path(path) = source else {
            return Err(PluginError::load(source.to_string(), "not a manifest path"));
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| PluginError::load(source.to_string(), e.to_string()))?;
        if !metadata.is_file() {
            return Err(PluginError::load(source.to_string(), "not a file"));
        }

        debug!(path = %path.display(), "Reading plugin manifest");
        manifest::read_manifest(path).await
    }
}

/// Factory producing a builtin plugin's export.
pub type BuiltinFactory = Arc<dyn Fn() -> PluginExport + Send + Sync>;

/// Loads plugins compiled into the host.
#[derive(Clone, Default)]
pub struct BuiltinLoader {
    factories: BTreeMap<String, BuiltinFactory>,
}

impl BuiltinLoader {
    /// Creates a loader with no builtins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builtin under `name`.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> PluginExport + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Registered builtin names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Sources for every registered builtin.
    pub fn sources(&self) -> Vec<PluginSource> {
        self.factories
            .keys()
            .map(|name| PluginSource::Builtin(name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for BuiltinLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinLoader")
            .field("builtins", &self.names())
            .finish()
    }
}

#[async_trait]
impl PluginLoader for BuiltinLoader {
    fn supports(&self, source: &PluginSource) -> bool {
        matches!(source, PluginSource::Builtin(_))
    }

    async fn load(&self, source: &PluginSource) -> PluginResult<PluginExport> {
        let PluginSource::Builtin(name) = source else {
            return Err(PluginError::load(source.to_string(), "not a builtin source"));
        };

        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PluginError::load(source.to_string(), "unknown builtin plugin"))?;

        Ok(factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source() {
        assert_eq!(
            PluginSource::parse("builtin:dependency-updater"),
            PluginSource::Builtin("dependency-updater".to_string())
        );
        assert_eq!(
            PluginSource::parse("./plugins/tagger.toml"),
            PluginSource::Path(PathBuf::from("./plugins/tagger.toml"))
        );
        assert_eq!(
            PluginSource::Builtin("x".to_string()).to_string(),
            "builtin:x"
        );
    }

    #[tokio::test]
    async fn test_builtin_loader() {
        let loader = BuiltinLoader::new().register("hello", || PluginExport::new("hello"));
        let source = PluginSource::parse("builtin:hello");

        assert!(loader.supports(&source));
        assert!(!loader.supports(&PluginSource::parse("hello.toml")));
        let export = loader.load(&source).await.unwrap();
        assert_eq!(export.name.as_deref(), Some("hello"));

        let err = loader
            .load(&PluginSource::parse("builtin:missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));
    }

    #[tokio::test]
    async fn test_manifest_loader_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManifestLoader
            .load(&PluginSource::from(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Load { .. }));
    }
}
