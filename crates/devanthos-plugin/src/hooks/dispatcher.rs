//! Hook dispatcher. Runs a lifecycle point's handlers one at a time and folds their output.
//!
//! - Handlers run in priority order; equal priorities keep registration order.
//! - Each handler sees the context accumulated by the handlers before it.
//! - A handler that errors or panics is reported and skipped. The chain
//!   continues with the context as it was before that handler ran.
//! - No timeout is applied here; a handler that never completes stalls
//!   the chain.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::error::PluginError;

use super::context::HookContext;
use super::definitions::LifecyclePoint;
use super::registry::HookRegistry;

/// One handler that did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    /// Plugin owning the handler.
    pub plugin: String,
    /// Failure message.
    pub message: String,
}

/// Outcome of executing one lifecycle point.
#[derive(Debug, Clone)]
pub struct HookReport {
    /// The point that was executed.
    pub point: LifecyclePoint,
    /// Final context after every handler ran.
    pub context: HookContext,
    /// Number of handlers invoked.
    pub invoked: usize,
    /// Handlers whose output was merged.
    pub merged: usize,
    /// Handlers that failed.
    pub failures: Vec<HookFailure>,
}

impl HookReport {
    /// Whether every handler succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatches lifecycle points to their bound handlers.
#[derive(Debug)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Failure reporting.
    diagnostics: Diagnostics,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher.
    pub fn new(registry: Arc<HookRegistry>, diagnostics: Diagnostics) -> Self {
        Self {
            registry,
            diagnostics,
        }
    }

    /// Runs every handler bound to `point` and returns the final context.
    pub async fn execute(&self, point: LifecyclePoint, context: HookContext) -> HookContext {
        self.execute_with_report(point, context).await.context
    }

    /// Runs every handler bound to `point`, reporting per-handler outcomes.
    pub async fn execute_with_report(
        &self,
        point: LifecyclePoint,
        context: HookContext,
    ) -> HookReport {
        // The registry lock is released before any handler runs.
        let bindings = self.registry.bindings(point).await;

        let mut report = HookReport {
            point,
            context,
            invoked: 0,
            merged: 0,
            failures: Vec::new(),
        };

        if bindings.is_empty() {
            return report;
        }

        debug!(point = %point, handlers = bindings.len(), "Executing hook");

        for binding in &bindings {
            report.invoked += 1;

            let outcome = AssertUnwindSafe(binding.handler.handle(point, &report.context))
                .catch_unwind()
                .await;

            let message = match outcome {
                Ok(Ok(Some(output))) => {
                    if report.context.apply(output) {
                        report.merged += 1;
                    }
                    continue;
                }
                Ok(Ok(None)) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };

            let error = PluginError::hook(point, &binding.plugin_name, &message);
            self.diagnostics.report(&error);
            report.failures.push(HookFailure {
                plugin: binding.plugin_name.clone(),
                message,
            });
        }

        debug!(
            point = %point,
            invoked = report.invoked,
            merged = report.merged,
            failed = report.failures.len(),
            "Hook executed"
        );

        report
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::hooks::definitions::{HookBinding, HookHandler};

    #[derive(Debug)]
    struct Returns(Value);

    #[async_trait]
    impl HookHandler for Returns {
        async fn handle(
            &self,
            _point: LifecyclePoint,
            _context: &HookContext,
        ) -> anyhow::Result<Option<Value>> {
            Ok(Some(self.0.clone()))
        }
    }

    #[derive(Debug)]
    struct Fails;

    #[async_trait]
    impl HookHandler for Fails {
        async fn handle(
            &self,
            _point: LifecyclePoint,
            _context: &HookContext,
        ) -> anyhow::Result<Option<Value>> {
            anyhow::bail!("exploded")
        }
    }

    #[derive(Debug)]
    struct Panics;

    #[async_trait]
    impl HookHandler for Panics {
        async fn handle(
            &self,
            _point: LifecyclePoint,
            _context: &HookContext,
        ) -> anyhow::Result<Option<Value>> {
            panic!("handler bug")
        }
    }

    /// Records the context it was invoked with.
    #[derive(Debug, Default)]
    struct Observer {
        seen: Mutex<Vec<HookContext>>,
    }

    #[async_trait]
    impl HookHandler for Observer {
        async fn handle(
            &self,
            _point: LifecyclePoint,
            context: &HookContext,
        ) -> anyhow::Result<Option<Value>> {
            self.seen.lock().unwrap().push(context.clone());
            Ok(None)
        }
    }

    fn handler(h: impl HookHandler + 'static) -> Arc<dyn HookHandler> {
        Arc::new(h)
    }

    async fn dispatcher_with(
        bindings: Vec<(&str, i32, Arc<dyn HookHandler>)>,
        diagnostics: Diagnostics,
    ) -> HookDispatcher {
        let registry = Arc::new(HookRegistry::new());
        for (name, priority, handler) in bindings {
            registry
                .register(
                    LifecyclePoint::AfterClone,
                    HookBinding::new(name, handler, priority),
                )
                .await;
        }
        HookDispatcher::new(registry, diagnostics)
    }

    #[tokio::test]
    async fn test_no_bindings_returns_input_unchanged() {
        let dispatcher = dispatcher_with(Vec::new(), Diagnostics::default()).await;
        let input = HookContext::new().with_string("framework", "astro");

        let report = dispatcher
            .execute_with_report(LifecyclePoint::AfterClone, input.clone())
            .await;

        assert_eq!(report.context, input);
        assert_eq!(report.invoked, 0);
    }

    #[tokio::test]
    async fn test_lower_priority_runs_first_and_merges() {
        let dispatcher = dispatcher_with(
            vec![
                ("a", 10, handler(Returns(json!({"tag": "A"})))),
                ("b", 5, handler(Returns(json!({"tag": "B", "note": "b"})))),
            ],
            Diagnostics::default(),
        )
        .await;

        let ctx = dispatcher
            .execute(LifecyclePoint::AfterClone, HookContext::new())
            .await;

        assert_eq!(
            serde_json::to_value(&ctx).unwrap(),
            json!({"tag": "A", "note": "b"})
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_reported() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let diagnostics = Diagnostics::default().with_callback(Arc::new(move |err: &PluginError| {
            sink.lock()
                .unwrap()
                .push(err.plugin_name().unwrap_or_default().to_string());
        }));

        let dispatcher = dispatcher_with(
            vec![
                ("d", 1, handler(Returns(json!({"done": true})))),
                ("c", 2, handler(Fails)),
            ],
            diagnostics,
        )
        .await;

        let report = dispatcher
            .execute_with_report(LifecyclePoint::AfterClone, HookContext::new())
            .await;

        assert_eq!(
            serde_json::to_value(&report.context).unwrap(),
            json!({"done": true})
        );
        assert_eq!(report.invoked, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].plugin, "c");
        assert_eq!(report.failures[0].message, "exploded");
        assert_eq!(*reported.lock().unwrap(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_chain() {
        let observer = Arc::new(Observer::default());
        let dispatcher = dispatcher_with(
            vec![
                ("first", 1, handler(Returns(json!({"step": 1})))),
                ("buggy", 2, handler(Panics)),
                ("last", 3, observer.clone() as Arc<dyn HookHandler>),
            ],
            Diagnostics::default(),
        )
        .await;

        let report = dispatcher
            .execute_with_report(LifecyclePoint::AfterClone, HookContext::new())
            .await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("handler bug"));
        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get_i64("step"), Some(1));
    }

    #[tokio::test]
    async fn test_earlier_handler_does_not_see_later_output() {
        let observer = Arc::new(Observer::default());
        let dispatcher = dispatcher_with(
            vec![
                ("late", 50, handler(Returns(json!({"late": true})))),
                ("early", 1, observer.clone() as Arc<dyn HookHandler>),
            ],
            Diagnostics::default(),
        )
        .await;

        let ctx = dispatcher
            .execute(LifecyclePoint::AfterClone, HookContext::new())
            .await;

        assert_eq!(ctx.get_bool("late"), Some(true));
        assert!(!observer.seen.lock().unwrap()[0].contains("late"));
    }
}
