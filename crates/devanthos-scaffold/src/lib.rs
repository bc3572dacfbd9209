//! # devanthos-scaffold
//!
//! The project scaffolding workflow driven by the plugin engine:
//!
//! - Project-name validation
//! - Template snapshot download and extraction
//! - Dependency installation with package-manager fallback
//! - Cached self update check
//! - The bundled `dependency-updater` plugin

pub mod install;
pub mod plugins;
pub mod template;
pub mod update;
pub mod validation;
pub mod workflow;

pub use install::{DependencyInstaller, InstallOutcome, PackageManager, PackageManagerInstaller};
pub use template::{TarballFetcher, TemplateFetcher};
pub use update::{UpdateChecker, UpdateStatus};
pub use validation::validate_project_name;
pub use workflow::{ScaffoldOutcome, ScaffoldRequest, ScaffoldWorkflow};
