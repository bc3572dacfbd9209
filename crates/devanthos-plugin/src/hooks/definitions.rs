//! Lifecycle point definitions, the handler trait, and hook bindings.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::HookContext;

/// Every point of the scaffolding workflow where hooks run.
///
/// The set is closed: hook keys that do not name one of these points are
/// ignored when a plugin is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecyclePoint {
    /// Fired before the template snapshot is fetched.
    BeforeClone,
    /// Fired after the template snapshot landed in the project directory.
    AfterClone,
    /// Fired before dependencies are installed.
    BeforeInstall,
    /// Fired after the dependency installation attempt.
    AfterInstall,
    /// Fired when a workflow stage fails.
    OnError,
    /// Fired once the project has been created.
    OnComplete,
}

impl LifecyclePoint {
    /// All points in workflow order.
    pub const ALL: [LifecyclePoint; 6] = [
        Self::BeforeClone,
        Self::AfterClone,
        Self::BeforeInstall,
        Self::AfterInstall,
        Self::OnError,
        Self::OnComplete,
    ];

    /// Returns the key plugins use to implement this point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeClone => "beforeClone",
            Self::AfterClone => "afterClone",
            Self::BeforeInstall => "beforeInstall",
            Self::AfterInstall => "afterInstall",
            Self::OnError => "onError",
            Self::OnComplete => "onComplete",
        }
    }

    /// Returns the snake_case spelling accepted in manifests.
    pub fn snake_name(&self) -> &'static str {
        match self {
            Self::BeforeClone => "before_clone",
            Self::AfterClone => "after_clone",
            Self::BeforeInstall => "before_install",
            Self::AfterInstall => "after_install",
            Self::OnError => "on_error",
            Self::OnComplete => "on_complete",
        }
    }

    /// Resolves a plugin hook key, accepting camelCase or snake_case.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|point| point.as_str() == key || point.snake_name() == key)
    }
}

impl std::fmt::Display for LifecyclePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LifecyclePoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("unknown lifecycle point '{s}'"))
    }
}

/// A hook implementation.
///
/// Handlers receive the context accumulated so far and may return a JSON
/// object that is shallow-merged over it. Returning `None` or a non-object
/// value leaves the context unchanged. An `Err` is reported as a hook
/// failure and never aborts the chain.
#[async_trait]
pub trait HookHandler: Send + Sync + std::fmt::Debug {
    /// Handles one invocation of `point`.
    async fn handle(&self, point: LifecyclePoint, context: &HookContext)
    -> anyhow::Result<Option<Value>>;
}

/// One entry in a lifecycle point's ordered handler list.
#[derive(Debug, Clone)]
pub struct HookBinding {
    /// Plugin that owns this handler.
    pub plugin_name: String,
    /// The handler.
    pub handler: Arc<dyn HookHandler>,
    /// Effective priority (lower = earlier execution).
    pub priority: i32,
}

impl HookBinding {
    /// Creates a new binding.
    pub fn new(plugin_name: impl Into<String>, handler: Arc<dyn HookHandler>, priority: i32) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            handler,
            priority,
        }
    }
}
