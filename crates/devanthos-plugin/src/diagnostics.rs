//! Non-fatal diagnostic reporting.
//!
//! The engine never prints. Every contained failure goes through
//! [`Diagnostics::report`], which logs via `tracing` and forwards to an
//! optional host callback.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PluginError;

/// Host callback receiving every contained failure.
pub type DiagnosticCallback = Arc<dyn Fn(&PluginError) + Send + Sync>;

/// Diagnostic configuration shared by the manager and the dispatcher.
#[derive(Clone, Default)]
pub struct Diagnostics {
    verbose: bool,
    callback: Option<DiagnosticCallback>,
}

impl Diagnostics {
    /// Creates a diagnostics sink.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            callback: None,
        }
    }

    /// Attaches a host callback.
    pub fn with_callback(mut self, callback: DiagnosticCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Whether load and discovery diagnostics are logged at `warn`.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Reports a contained failure.
    ///
    /// Hook failures are always logged at `warn`; load and discovery
    /// failures only when verbose, otherwise at `debug`.
    pub fn report(&self, error: &PluginError) {
        match error {
            PluginError::HookExecution {
                point,
                plugin,
                message,
            } => {
                warn!(point = %point, plugin = %plugin, error = %message, "Hook handler failed");
            }
            PluginError::DiscoveryIo { path, source } => {
                if self.verbose {
                    warn!(path = %path.display(), error = %source, "Plugin directory unreadable");
                } else {
                    debug!(path = %path.display(), error = %source, "Plugin directory unreadable");
                }
            }
            PluginError::InvalidPlugin { origin, reason } | PluginError::Load { origin, reason } => {
                if self.verbose {
                    warn!(origin = %origin, error = %reason, "Plugin not loaded");
                } else {
                    debug!(origin = %origin, error = %reason, "Plugin not loaded");
                }
            }
        }

        if let Some(callback) = &self.callback {
            callback(error);
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("verbose", &self.verbose)
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::hooks::definitions::LifecyclePoint;

    #[test]
    fn test_callback_receives_every_report() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let diagnostics = Diagnostics::new(false).with_callback(Arc::new(move |err: &PluginError| {
            sink.lock().unwrap().push(err.to_string());
        }));

        diagnostics.report(&PluginError::invalid("a.toml", "missing name"));
        diagnostics.report(&PluginError::hook(LifecyclePoint::AfterClone, "c", "boom"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], "invalid plugin a.toml: missing name");
        assert_eq!(seen[1], "hook afterClone of plugin 'c' failed: boom");
    }
}
