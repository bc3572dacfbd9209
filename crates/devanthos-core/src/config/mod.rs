//! Application configuration schemas.
//!
//! Configuration is assembled by the `config` crate from optional TOML
//! files and `DEVANTHOS_`-prefixed environment variables. Each sub-module
//! represents a logical configuration section.

pub mod install;
pub mod logging;
pub mod plugin;
pub mod template;
pub mod update;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use self::install::InstallConfig;
pub use self::logging::LoggingConfig;
pub use self::plugin::PluginConfig;
pub use self::template::{TemplateConfig, builtin_templates};
pub use self::update::UpdateConfig;

use crate::error::AppError;

/// Environment variable prefix for every configuration key.
pub const ENV_PREFIX: &str = "DEVANTHOS";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Print plugin load and discovery diagnostics (`DEVANTHOS_VERBOSE`).
    #[serde(default)]
    pub verbose: bool,
    /// Skip the automatic update check (`DEVANTHOS_NO_UPDATE_CHECK`).
    #[serde(default)]
    pub no_update_check: bool,
    /// Let the bundled dependency updater bump package versions (`DEVANTHOS_UPDATE_DEPS`).
    #[serde(default = "default_true")]
    pub update_deps: bool,
    /// Run a security audit after installing (`DEVANTHOS_AUDIT`).
    #[serde(default)]
    pub audit: bool,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plugin system settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Additional or overriding templates keyed by framework id.
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,
    /// Dependency installation settings.
    #[serde(default)]
    pub install: InstallConfig,
    /// Update-check settings.
    #[serde(default)]
    pub update: UpdateConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            no_update_check: false,
            update_deps: true,
            audit: false,
            logging: LoggingConfig::default(),
            plugins: PluginConfig::default(),
            templates: BTreeMap::new(),
            install: InstallConfig::default(),
            update: UpdateConfig::default(),
        }
    }
}

/// Where configuration is read from, lowest precedence first.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// User-wide file, normally `~/.devanthos/config.toml`.
    pub user_file: Option<PathBuf>,
    /// Project-local file, normally `./devanthos.toml`.
    pub project_file: Option<PathBuf>,
    /// File passed explicitly on the command line. Must exist.
    pub explicit_file: Option<PathBuf>,
    /// Replacement for the process environment (used by tests).
    pub environment: Option<HashMap<String, String>>,
}

impl ConfigSources {
    /// Standard sources for the current process.
    pub fn standard(explicit_file: Option<&Path>) -> Self {
        Self {
            user_file: devanthos_home().map(|home| home.join("config.toml")),
            project_file: Some(PathBuf::from("devanthos.toml")),
            explicit_file: explicit_file.map(Path::to_path_buf),
            environment: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the standard locations and the environment.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, AppError> {
        Self::load_from(ConfigSources::standard(explicit_file))
    }

    /// Load configuration from the given sources.
    ///
    /// Later sources override earlier ones; environment variables win.
    pub fn load_from(sources: ConfigSources) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();

        if let Some(path) = sources.user_file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        if let Some(path) = sources.project_file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        if let Some(path) = sources.explicit_file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(sources.environment),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Built-in templates overlaid with configured ones.
    pub fn template_catalog(&self) -> BTreeMap<String, TemplateConfig> {
        let mut catalog = builtin_templates();
        catalog.extend(self.templates.clone());
        catalog
    }
}

/// The per-user Devanthos directory (`~/.devanthos`).
pub fn devanthos_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".devanthos"))
}

fn default_true() -> bool {
    true
}
