//! Prelude for writing plugins.

pub use async_trait::async_trait;

pub use crate::error::{PluginError, PluginResult};
pub use crate::exports::{HookExport, PluginExport};
pub use crate::hooks::context::{HookContext, keys};
pub use crate::hooks::definitions::{HookHandler, LifecyclePoint};
pub use crate::loader::{BuiltinLoader, PluginSource};
pub use crate::manager::{PluginManager, PluginManagerConfig};
pub use crate::registry::PluginOrigin;
pub use crate::traits::{ClosureHandler, StaticPatch};

pub use crate::hook_context;
