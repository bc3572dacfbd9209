//! Dependency installation through the first working package manager.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use devanthos_core::error::AppError;
use devanthos_core::result::AppResult;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    /// pnpm.
    Pnpm,
    /// Yarn.
    Yarn,
    /// Bun.
    Bun,
    /// npm.
    Npm,
}

impl PackageManager {
    /// Every manager in preference order.
    pub const ALL: [PackageManager; 4] = [Self::Pnpm, Self::Yarn, Self::Bun, Self::Npm];

    /// Executable name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
            Self::Npm => "npm",
        }
    }

    /// Lockfile written by this manager.
    pub fn lockfile(&self) -> &'static str {
        match self {
            Self::Pnpm => "pnpm-lock.yaml",
            Self::Yarn => "yarn.lock",
            Self::Bun => "bun.lockb",
            Self::Npm => "package-lock.json",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

impl FromStr for PackageManager {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.command().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("Unknown package manager: {s}")))
    }
}

/// A package manager found on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedManager {
    /// Which manager.
    pub manager: PackageManager,
    /// Resolved executable.
    pub program: PathBuf,
}

/// Managers available on `PATH`, in preference order.
pub fn detect_managers() -> Vec<DetectedManager> {
    PackageManager::ALL
        .into_iter()
        .filter_map(|manager| {
            which::which(manager.command())
                .ok()
                .map(|program| DetectedManager { manager, program })
        })
        .collect()
}

/// Orders `available` so the manager owning a lockfile in `project` goes first.
pub fn install_order(available: &[DetectedManager], project: &Path) -> Vec<DetectedManager> {
    let preferred = PackageManager::ALL
        .into_iter()
        .find(|m| project.join(m.lockfile()).is_file());

    let mut ordered = available.to_vec();
    if let Some(preferred) = preferred {
        // Stable: the rest keep their preference order.
        ordered.sort_by_key(|d| d.manager != preferred);
    }
    ordered
}

/// Result of a successful install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    /// Manager that installed the dependencies.
    pub manager: PackageManager,
}

/// Installs a project's dependencies.
#[async_trait]
pub trait DependencyInstaller: Send + Sync + std::fmt::Debug {
    /// Installs the dependencies declared in `project`/package.json.
    async fn install(&self, project: &Path) -> AppResult<InstallOutcome>;
}

/// Runs `<manager> install`, falling back through the available managers.
#[derive(Debug, Clone)]
pub struct PackageManagerInstaller {
    managers: Option<Vec<DetectedManager>>,
    timeout: Duration,
}

impl PackageManagerInstaller {
    /// Creates an installer that detects managers on `PATH` at install time.
    pub fn new(timeout: Duration) -> Self {
        Self {
            managers: None,
            timeout,
        }
    }

    /// Uses a fixed manager list instead of detecting one.
    pub fn with_managers(mut self, managers: Vec<DetectedManager>) -> Self {
        self.managers = Some(managers);
        self
    }

    async fn run(&self, detected: &DetectedManager, project: &Path) -> Result<(), String> {
        let child = Command::new(&detected.program)
            .arg("install")
            .current_dir(project)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start: {e}"))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| e.to_string())?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty());
        Err(match (output.status.code(), last_line) {
            (Some(code), Some(line)) => format!("exited with code {code}: {}", line.trim()),
            (Some(code), None) => format!("exited with code {code}"),
            (None, _) => "terminated by signal".to_string(),
        })
    }
}

#[async_trait]
impl DependencyInstaller for PackageManagerInstaller {
    async fn install(&self, project: &Path) -> AppResult<InstallOutcome> {
        if !tokio::fs::try_exists(project.join("package.json"))
            .await
            .unwrap_or(false)
        {
            return Err(AppError::not_found(format!(
                "No package.json found in {}",
                project.display()
            )));
        }

        let available = match &self.managers {
            Some(managers) => managers.clone(),
            None => detect_managers(),
        };
        let hint = manual_install_hint(project);

        if available.is_empty() {
            return Err(AppError::install(format!(
                "No package manager found (tried pnpm, yarn, bun, npm). {hint}"
            )));
        }

        for detected in install_order(&available, project) {
            info!(manager = %detected.manager, path = %project.display(), "Installing dependencies");
            match self.run(&detected, project).await {
                Ok(()) => {
                    return Ok(InstallOutcome {
                        manager: detected.manager,
                    });
                }
                Err(reason) => {
                    warn!(manager = %detected.manager, reason = %reason, "Package manager failed");
                }
            }
        }

        debug!(tried = available.len(), "Every package manager failed");
        Err(AppError::install(format!(
            "Could not install dependencies with any package manager. {hint}"
        )))
    }
}

/// Manual fallback shown when installation fails.
pub fn manual_install_hint(project: &Path) -> String {
    let name = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project.display().to_string());
    format!("Install them manually: cd {name} && npm install")
}

#[cfg(test)]
mod tests {
    use devanthos_core::error::ErrorKind;

    use super::*;

    fn detected(manager: PackageManager, program: &str) -> DetectedManager {
        DetectedManager {
            manager,
            program: PathBuf::from(program),
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        dir
    }

    #[test]
    fn test_lockfile_moves_manager_first() {
        let dir = project();
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();
        let available = vec![
            detected(PackageManager::Pnpm, "pnpm"),
            detected(PackageManager::Yarn, "yarn"),
            detected(PackageManager::Npm, "npm"),
        ];

        let order: Vec<PackageManager> = install_order(&available, dir.path())
            .into_iter()
            .map(|d| d.manager)
            .collect();

        assert_eq!(
            order,
            vec![PackageManager::Yarn, PackageManager::Pnpm, PackageManager::Npm]
        );
    }

    #[test]
    fn test_parse_manager() {
        assert_eq!("PNPM".parse::<PackageManager>().unwrap(), PackageManager::Pnpm);
        assert!("cargo".parse::<PackageManager>().is_err());
    }

    #[tokio::test]
    async fn test_missing_package_json() {
        let dir = tempfile::tempdir().unwrap();
        let installer = PackageManagerInstaller::new(Duration::from_secs(5)).with_managers(vec![]);
        let err = installer.install(dir.path()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_no_managers_gives_hint() {
        let dir = project();
        let installer = PackageManagerInstaller::new(Duration::from_secs(5)).with_managers(vec![]);
        let err = installer.install(dir.path()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Install);
        assert!(err.message.contains("npm install"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_falls_back_to_next_manager() {
        let dir = project();
        let installer = PackageManagerInstaller::new(Duration::from_secs(5)).with_managers(vec![
            detected(PackageManager::Pnpm, "/bin/false"),
            detected(PackageManager::Npm, "/bin/true"),
        ]);

        let outcome = installer.install(dir.path()).await.unwrap();
        assert_eq!(outcome.manager, PackageManager::Npm);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_all_managers_fail() {
        let dir = project();
        let installer = PackageManagerInstaller::new(Duration::from_secs(5))
            .with_managers(vec![detected(PackageManager::Yarn, "/bin/false")]);

        let err = installer.install(dir.path()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Install);
        let name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(err.message.contains(&format!("cd {name} && npm install")));
    }
}
