//! Hook handler that runs an external command.
//!
//! The context is written to the child's stdin as JSON. The child's stdout,
//! when it holds JSON, is the returned patch:
//!
//! - exit 0, empty stdout → no patch
//! - exit 0, JSON stdout → that value is returned (objects are merged)
//! - exit 0, other stdout → no patch, logged
//! - non-zero exit, spawn failure or timeout → handler error

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::hooks::context::HookContext;
use crate::hooks::definitions::{HookHandler, LifecyclePoint};

/// Environment variable naming the lifecycle point being executed.
pub const HOOK_ENV_VAR: &str = "DEVANTHOS_HOOK";

/// A hook implemented by a shell command.
#[derive(Debug, Clone)]
pub struct CommandHookHandler {
    plugin_name: String,
    command: String,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl CommandHookHandler {
    /// Creates a handler running `command` through the platform shell.
    pub fn new(plugin_name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            command: command.into(),
            working_dir: None,
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Runs the command in `dir`.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Adds environment variables for the child.
    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Kills the command after `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    fn shell_command(&self) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        };
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env);
        cmd
    }
}

#[async_trait]
impl HookHandler for CommandHookHandler {
    async fn handle(
        &self,
        point: LifecyclePoint,
        context: &HookContext,
    ) -> anyhow::Result<Option<Value>> {
        let input = serde_json::to_vec(context).context("failed to serialize hook context")?;

        debug!(
            plugin = %self.plugin_name,
            point = %point,
            command = %self.command,
            "Spawning hook command"
        );

        let mut child = self
            .shell_command()
            .env(HOOK_ENV_VAR, point.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn hook command: {}", self.command))?;

        // Fed concurrently with draining stdout so neither pipe can fill up
        // and the timeout covers the whole exchange.
        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&input).await {
                // A child that never reads stdin closes the pipe early.
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        });

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    writer.abort();
                    bail!("hook command timed out after {limit:?}");
                }
            },
            None => child.wait_with_output().await,
        }
        .context("hook command failed to complete")?;

        writer
            .await
            .context("hook stdin writer stopped unexpectedly")?
            .context("failed to write hook context to stdin")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            if stderr.trim().is_empty() {
                bail!("hook command exited with code {code}");
            }
            bail!("hook command exited with code {code}: {}", stderr.trim());
        }

        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Value>(stdout) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    plugin = %self.plugin_name,
                    point = %point,
                    error = %e,
                    "Hook command output is not JSON, ignoring"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_stdout_json_is_patch() {
        let handler = CommandHookHandler::new("t", r#"echo '{"tag":"A"}'"#);
        let out = handler
            .handle(LifecyclePoint::AfterClone, &HookContext::new())
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"tag": "A"})));
    }

    #[tokio::test]
    async fn test_context_on_stdin_and_point_in_env() {
        let handler = CommandHookHandler::new(
            "t",
            r#"input=$(cat); printf '{"input":%s,"hook":"%s"}' "$input" "$DEVANTHOS_HOOK""#,
        );
        let ctx = HookContext::new().with_string("framework", "next");
        let out = handler
            .handle(LifecyclePoint::BeforeInstall, &ctx)
            .await
            .unwrap();
        assert_eq!(
            out,
            Some(json!({"input": {"framework": "next"}, "hook": "beforeInstall"}))
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let handler = CommandHookHandler::new("t", "echo broken >&2; exit 3");
        let err = handler
            .handle(LifecyclePoint::AfterClone, &HookContext::new())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("code 3"));
        assert!(message.contains("broken"));
    }

    #[tokio::test]
    async fn test_empty_and_non_json_stdout_is_no_patch() {
        let quiet = CommandHookHandler::new("t", "true");
        let chatty = CommandHookHandler::new("t", "echo hello");
        let ctx = HookContext::new();
        assert_eq!(quiet.handle(LifecyclePoint::OnComplete, &ctx).await.unwrap(), None);
        assert_eq!(chatty.handle(LifecyclePoint::OnComplete, &ctx).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_env_and_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let mut env = BTreeMap::new();
        env.insert("TAG".to_string(), "B".to_string());

        let handler = CommandHookHandler::new(
            "t",
            r#"printf '{"tag":"%s","marker":"%s"}' "$TAG" "$(cat marker.txt)""#,
        )
        .working_dir(dir.path())
        .envs(env);

        let out = handler
            .handle(LifecyclePoint::AfterClone, &HookContext::new())
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"tag": "B", "marker": "here"})));
    }

    #[tokio::test]
    async fn test_timeout_is_error() {
        let handler = CommandHookHandler::new("t", "sleep 5").timeout(Some(Duration::from_millis(100)));
        let err = handler
            .handle(LifecyclePoint::AfterClone, &HookContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    fn large_context() -> HookContext {
        HookContext::new().with_string("blob", &"x".repeat(1024 * 1024))
    }

    #[tokio::test]
    async fn test_timeout_applies_while_child_ignores_stdin() {
        let handler =
            CommandHookHandler::new("t", "sleep 30").timeout(Some(Duration::from_millis(200)));
        let ctx = large_context();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            handler.handle(LifecyclePoint::AfterClone, &ctx),
        )
        .await
        .expect("handler must honour its own timeout");

        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_large_context_echoed_back() {
        let handler = CommandHookHandler::new("t", "cat").timeout(Some(Duration::from_secs(10)));
        let ctx = large_context();

        let out = handler
            .handle(LifecyclePoint::AfterClone, &ctx)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(out["blob"].as_str().map(str::len), Some(1024 * 1024));
    }
}
