//! Plugin manifest discovery across project and user locations.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use devanthos_core::config::PluginConfig;
use tracing::debug;

use crate::error::PluginError;
use crate::manifest::MANIFEST_SUFFIX;

/// Default locations scanned before any caller-supplied path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPaths {
    paths: Vec<PathBuf>,
}

impl DiscoveryPaths {
    /// Standard locations: project manifest, project plugin directory, user plugin directory.
    pub fn standard() -> Self {
        Self::from_config(&PluginConfig::default())
    }

    /// Locations from plugin configuration, including its extra paths.
    pub fn from_config(config: &PluginConfig) -> Self {
        let mut paths = vec![config.project_manifest.clone(), config.project_dir.clone()];
        paths.extend(config.user_plugin_dir());
        paths.extend(config.extra_paths.iter().cloned());
        Self { paths }
    }

    /// Explicit list of locations.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// No default locations.
    pub fn none() -> Self {
        Self { paths: Vec::new() }
    }

    /// Locations in scan order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Default for DiscoveryPaths {
    fn default() -> Self {
        Self::standard()
    }
}

/// Whether `path` names a plugin manifest by its suffix.
pub fn is_plugin_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(MANIFEST_SUFFIX) && name.len() > MANIFEST_SUFFIX.len())
        .unwrap_or(false)
}

/// Manifest files to load for one search path.
///
/// A missing path yields nothing. A file is returned as is, whatever its
/// name. A directory yields its immediate manifest files sorted by name.
pub async fn scan_path(path: &Path) -> Result<Vec<PathBuf>, PluginError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Plugin path does not exist");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(PluginError::DiscoveryIo {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let io_error = |source: std::io::Error| PluginError::DiscoveryIo {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(path).await.map_err(io_error)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let candidate = entry.path();
        if !is_plugin_file(&candidate) {
            continue;
        }
        // Follows symlinks so linked manifests are picked up.
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => files.push(candidate),
            _ => continue,
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(path = %path.display(), found = files.len(), "Scanned plugin directory");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plugin_file() {
        assert!(is_plugin_file(Path::new("a/tagger.toml")));
        assert!(is_plugin_file(Path::new("tagger.plugin.toml")));
        assert!(!is_plugin_file(Path::new("notes.md")));
        assert!(!is_plugin_file(Path::new(".toml")));
    }

    #[test]
    fn test_from_config_order() {
        let config = PluginConfig {
            user_dir: Some(PathBuf::from("/home/u/.devanthos/plugins")),
            extra_paths: vec![PathBuf::from("/opt/plugins")],
            ..Default::default()
        };
        let paths = DiscoveryPaths::from_config(&config);
        assert_eq!(
            paths.paths(),
            &[
                PathBuf::from("devanthos.plugins.toml"),
                PathBuf::from(".devanthos/plugins"),
                PathBuf::from("/home/u/.devanthos/plugins"),
                PathBuf::from("/opt/plugins"),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_missing_path_is_empty() {
        let files = scan_path(Path::new("/definitely/not/here")).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_scan_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.toml"), "").unwrap();
        std::fs::write(dir.path().join("a.plugin.toml"), "").unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested.toml")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.toml"), "").unwrap();

        let files = scan_path(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.plugin.toml", "b.toml"]);
    }

    #[tokio::test]
    async fn test_scan_file_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.plugin");
        std::fs::write(&file, "").unwrap();
        assert_eq!(scan_path(&file).await.unwrap(), vec![file]);
    }
}
