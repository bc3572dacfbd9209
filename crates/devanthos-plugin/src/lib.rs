//! # devanthos-plugin
//!
//! Plugin engine for Devanthos. Provides:
//!
//! - A plugin registry keyed by unique name (last load wins)
//! - Per lifecycle point hook bindings, stably ordered by priority
//! - A sequential hook dispatcher that merges handler output into a shared
//!   context and isolates every handler failure
//! - Loaders for TOML plugin manifests and compiled-in plugins
//! - Discovery of plugin manifests across project and user directories

pub mod command;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod exports;
pub mod hooks;
pub mod loader;
pub mod macros;
pub mod manager;
pub mod manifest;
pub mod prelude;
pub mod registry;
pub mod traits;

pub use diagnostics::Diagnostics;
pub use discovery::DiscoveryPaths;
pub use error::{PluginError, PluginResult};
pub use exports::{HookExport, PluginExport};
pub use hooks::context::HookContext;
pub use hooks::definitions::{HookBinding, HookHandler, LifecyclePoint};
pub use hooks::dispatcher::{HookDispatcher, HookFailure, HookReport};
pub use hooks::registry::HookRegistry;
pub use loader::{BuiltinLoader, ManifestLoader, PluginLoader, PluginSource};
pub use manager::{PluginManager, PluginManagerConfig};
pub use registry::{PluginDescriptor, PluginInfo, PluginOrigin, PluginRegistry};

#[doc(hidden)]
pub use serde_json as __serde_json;
