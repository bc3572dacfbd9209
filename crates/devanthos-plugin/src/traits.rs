//! Convenience handler implementations.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::hooks::context::HookContext;
use crate::hooks::definitions::{HookHandler, LifecyclePoint};

type BoxedHookFuture = Pin<Box<dyn Future<Output = anyhow::Result<Option<Value>>> + Send>>;

/// A closure-based hook handler.
///
/// The closure receives an owned snapshot of the context so the returned
/// future can be `'static`.
pub struct ClosureHandler {
    /// Label shown in debug output.
    label: String,
    /// Handler function.
    handler: Arc<dyn Fn(HookContext) -> BoxedHookFuture + Send + Sync>,
}

impl std::fmt::Debug for ClosureHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureHandler")
            .field("label", &self.label)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(label: &str, handler: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self {
            label: label.to_string(),
            handler: Arc::new(move |context| Box::pin(handler(context))),
        }
    }

    /// Wraps a closure into an `Arc<dyn HookHandler>`.
    pub fn wrap<F, Fut>(label: &str, handler: F) -> Arc<dyn HookHandler>
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Arc::new(Self::new(label, handler))
    }
}

#[async_trait]
impl HookHandler for ClosureHandler {
    async fn handle(
        &self,
        _point: LifecyclePoint,
        context: &HookContext,
    ) -> anyhow::Result<Option<Value>> {
        (self.handler)(context.clone()).await
    }
}

/// A handler that always returns the same patch.
#[derive(Debug, Clone)]
pub struct StaticPatch {
    patch: Value,
}

impl StaticPatch {
    /// Creates a handler returning `patch` on every invocation.
    pub fn new(patch: Value) -> Self {
        Self { patch }
    }
}

#[async_trait]
impl HookHandler for StaticPatch {
    async fn handle(
        &self,
        _point: LifecyclePoint,
        _context: &HookContext,
    ) -> anyhow::Result<Option<Value>> {
        Ok(Some(self.patch.clone()))
    }
}
