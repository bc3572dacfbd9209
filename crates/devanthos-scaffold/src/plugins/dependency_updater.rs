//! Bundled `dependency-updater` plugin.
//!
//! After the template is cloned it bumps the framework's key packages in
//! `package.json` to the newest release on the npm registry. After install it
//! can run `npm audit` and report the vulnerability count.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::{Map, Value, json};
use tokio::process::Command;
use tracing::{debug, info};

use devanthos_core::error::AppError;
use devanthos_core::result::AppResult;
use devanthos_plugin::prelude::*;

/// Registered plugin name.
pub const PLUGIN_NAME: &str = "dependency-updater";

/// Runs before plugins with the default priority.
pub const PLUGIN_PRIORITY: i32 = 50;

/// Resolves the newest published version of an npm package.
#[async_trait]
pub trait VersionLookup: Send + Sync + std::fmt::Debug {
    /// Latest version, or `None` when it cannot be determined.
    async fn latest(&self, package: &str) -> Option<String>;
}

/// [`VersionLookup`] backed by the npm registry.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a lookup against `base_url` (e.g. `https://registry.npmjs.org`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("devanthos-dependency-updater")
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VersionLookup for NpmRegistry {
    async fn latest(&self, package: &str) -> Option<String> {
        let url = format!("{}/{}/latest", self.base_url, package);
        let response = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(package, status = %response.status(), "Registry lookup failed");
                return None;
            }
            Err(e) => {
                debug!(package, error = %e, "Registry lookup failed");
                return None;
            }
        };
        let body: Value = response.json().await.ok()?;
        body.get("version")?.as_str().map(str::to_string)
    }
}

/// Toggles read from the application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyUpdaterSettings {
    /// Bump package versions after cloning.
    pub update_deps: bool,
    /// Run `npm audit` after installing.
    pub audit: bool,
}

impl Default for DependencyUpdaterSettings {
    fn default() -> Self {
        Self {
            update_deps: true,
            audit: false,
        }
    }
}

/// One rewritten version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
    /// Package name.
    pub package: String,
    /// Previous range.
    pub from: String,
    /// New range.
    pub to: String,
    /// `dependencies` or `devDependencies`.
    pub section: &'static str,
}

/// Packages kept current for one framework.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkPackages {
    /// Entries of `dependencies`.
    pub runtime: &'static [&'static str],
    /// Entries of `devDependencies`.
    pub dev: &'static [&'static str],
}

/// Tracked packages for `framework`.
pub fn framework_packages(framework: &str) -> Option<FrameworkPackages> {
    match framework {
        "astro" => Some(FrameworkPackages {
            runtime: &["astro"],
            dev: &["@astrojs/tailwind", "tailwindcss", "typescript"],
        }),
        "next" => Some(FrameworkPackages {
            runtime: &["next", "react", "react-dom"],
            dev: &["@types/react", "@types/node", "typescript", "tailwindcss"],
        }),
        "expo" => Some(FrameworkPackages {
            runtime: &["expo", "react", "react-native"],
            dev: &["@types/react", "typescript"],
        }),
        _ => None,
    }
}

/// Rewrites the framework's packages in `project`/package.json to `^<latest>`.
///
/// Only packages the manifest already declares are touched. The file is
/// rewritten, with four-space indentation, only when something changed.
pub async fn update_dependencies(
    project: &Path,
    framework: &str,
    lookup: &dyn VersionLookup,
) -> anyhow::Result<Vec<PackageUpdate>> {
    let Some(tracked) = framework_packages(framework) else {
        debug!(framework, "No packages tracked for framework");
        return Ok(Vec::new());
    };

    let manifest_path = project.join("package.json");
    let raw = match tokio::fs::read_to_string(&manifest_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).context("failed to read package.json"),
    };
    let mut manifest: Value = serde_json::from_str(&raw).context("package.json is not valid JSON")?;

    let mut updates = Vec::new();
    for (section, packages) in [
        ("dependencies", tracked.runtime),
        ("devDependencies", tracked.dev),
    ] {
        let Some(declared) = manifest.get_mut(section).and_then(Value::as_object_mut) else {
            continue;
        };
        bump_section(declared, section, packages, lookup, &mut updates).await;
    }

    if !updates.is_empty() {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        serde::Serialize::serialize(&manifest, &mut serializer)?;
        out.push(b'\n');
        tokio::fs::write(&manifest_path, out)
            .await
            .context("failed to write package.json")?;
    }

    Ok(updates)
}

async fn bump_section(
    declared: &mut Map<String, Value>,
    section: &'static str,
    packages: &[&str],
    lookup: &dyn VersionLookup,
    updates: &mut Vec<PackageUpdate>,
) {
    for &package in packages {
        let Some(current) = declared.get(package) else {
            continue;
        };
        let from = current.as_str().unwrap_or_default().to_string();
        let Some(latest) = lookup.latest(package).await else {
            continue;
        };
        let to = format!("^{latest}");
        if from == to {
            continue;
        }
        declared.insert(package.to_string(), Value::String(to.clone()));
        updates.push(PackageUpdate {
            package: package.to_string(),
            from,
            to,
            section,
        });
    }
}

/// Sums the vulnerability counts of an `npm audit --json` report.
pub fn count_vulnerabilities(report: &Value) -> u64 {
    let Some(counts) = report.pointer("/metadata/vulnerabilities") else {
        return 0;
    };
    ["low", "moderate", "high", "critical"]
        .iter()
        .filter_map(|level| counts.get(level).and_then(Value::as_u64))
        .sum()
}

async fn run_audit(project: &Path) -> anyhow::Result<u64> {
    let output = Command::new("npm")
        .args(["audit", "--json"])
        .current_dir(project)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .context("failed to run npm audit")?;

    // npm audit exits non-zero when it finds anything; the report is still on stdout.
    let report: Value =
        serde_json::from_slice(&output.stdout).context("npm audit output is not JSON")?;
    Ok(count_vulnerabilities(&report))
}

fn project_dir(ctx: &HookContext) -> Option<PathBuf> {
    ctx.project_path()
        .or_else(|| ctx.project_name().map(PathBuf::from))
}

/// Builds the plugin export.
pub fn export(settings: DependencyUpdaterSettings, lookup: Arc<dyn VersionLookup>) -> PluginExport {
    PluginExport::new(PLUGIN_NAME)
        .version("1.0.0")
        .description("Updates the project's key dependencies to their latest versions")
        .author("Devanthos Team")
        .priority(PLUGIN_PRIORITY)
        .on_fn(LifecyclePoint::AfterClone, move |ctx: HookContext| {
            let lookup = lookup.clone();
            async move {
                if !settings.update_deps {
                    return Ok(None);
                }
                let (Some(project), Some(framework)) = (project_dir(&ctx), ctx.framework()) else {
                    return Ok(None);
                };

                let updates = update_dependencies(&project, framework, lookup.as_ref()).await?;
                for update in &updates {
                    debug!(
                        package = %update.package,
                        from = %update.from,
                        to = %update.to,
                        section = update.section,
                        "Dependency bumped"
                    );
                }
                if !updates.is_empty() {
                    info!(count = updates.len(), "Dependencies updated to latest versions");
                }
                let patch = HookContext::new().with_bool(keys::DEPENDENCIES_UPDATED, !updates.is_empty());
                Ok(Some(Value::Object(patch.into_map())))
            }
        })
        .on_fn(LifecyclePoint::AfterInstall, move |ctx: HookContext| async move {
            if !settings.audit || ctx.contains(keys::INSTALL_ERROR) {
                return Ok(None);
            }
            let Some(project) = project_dir(&ctx) else {
                return Ok(None);
            };

            match run_audit(&project).await {
                Ok(total) => {
                    info!(vulnerabilities = total, "Security audit finished");
                    let patch = HookContext::new().with_data(keys::AUDIT_VULNERABILITIES, json!(total));
                    Ok(Some(Value::Object(patch.into_map())))
                }
                Err(e) => {
                    debug!(error = %e, "Security audit unavailable");
                    Ok(None)
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Default)]
    struct FixedVersions(BTreeMap<&'static str, &'static str>);

    #[async_trait]
    impl VersionLookup for FixedVersions {
        async fn latest(&self, package: &str) -> Option<String> {
            self.0.get(package).map(|v| v.to_string())
        }
    }

    fn lookup() -> FixedVersions {
        FixedVersions(BTreeMap::from([
            ("next", "15.1.0"),
            ("react", "19.0.0"),
            ("typescript", "5.7.2"),
            ("tailwindcss", "4.0.0"),
        ]))
    }

    fn write_package_json(dir: &Path, body: Value) {
        std::fs::write(dir.join("package.json"), serde_json::to_string(&body).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_update_only_declared_packages() {
        let dir = tempfile::tempdir().unwrap();
        write_package_json(
            dir.path(),
            json!({
                "name": "site",
                "dependencies": { "next": "14.0.0", "react": "^18.2.0", "zod": "^3.0.0" },
                "devDependencies": { "typescript": "^5.0.0" }
            }),
        );

        let updates = update_dependencies(dir.path(), "next", &lookup()).await.unwrap();

        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].package, "next");
        assert_eq!(updates[0].from, "14.0.0");
        assert_eq!(updates[0].to, "^15.1.0");
        assert_eq!(updates[2].section, "devDependencies");

        let raw = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(raw.starts_with("{\n    \"name\": \"site\""));
        assert!(raw.ends_with("}\n"));
        let written: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(written["dependencies"]["react"], "^19.0.0");
        assert_eq!(written["dependencies"]["zod"], "^3.0.0");
        assert!(written["devDependencies"].get("tailwindcss").is_none());
    }

    #[tokio::test]
    async fn test_unknown_framework_or_missing_manifest_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(update_dependencies(dir.path(), "next", &lookup()).await.unwrap().is_empty());

        write_package_json(dir.path(), json!({"dependencies": {"next": "14.0.0"}}));
        assert!(update_dependencies(dir.path(), "svelte", &lookup()).await.unwrap().is_empty());
    }

    #[test]
    fn test_count_vulnerabilities() {
        let report = json!({
            "metadata": { "vulnerabilities": { "info": 4, "low": 1, "moderate": 2, "high": 0, "critical": 3 } }
        });
        assert_eq!(count_vulnerabilities(&report), 6);
        assert_eq!(count_vulnerabilities(&json!({})), 0);
    }

    #[tokio::test]
    async fn test_after_clone_hook_reports_update() {
        let dir = tempfile::tempdir().unwrap();
        write_package_json(dir.path(), json!({"dependencies": {"next": "14.0.0"}}));

        let manager = PluginManager::new(PluginManagerConfig::isolated());
        manager
            .load_export(
                export(DependencyUpdaterSettings::default(), Arc::new(lookup())),
                PluginOrigin::Builtin(PLUGIN_NAME.to_string()),
            )
            .await
            .unwrap();

        let ctx = HookContext::new()
            .with_string(keys::FRAMEWORK, "next")
            .with_string(keys::PROJECT_PATH, &dir.path().to_string_lossy());
        let ctx = manager.execute_hook(LifecyclePoint::AfterClone, ctx).await;

        assert_eq!(ctx.get_bool(keys::DEPENDENCIES_UPDATED), Some(true));
        let info = manager.get_plugin(PLUGIN_NAME).await.unwrap().info();
        assert_eq!(info.priority, 50);
        assert_eq!(info.author, "Devanthos Team");
    }

    #[tokio::test]
    async fn test_after_clone_disabled_leaves_context() {
        let dir = tempfile::tempdir().unwrap();
        write_package_json(dir.path(), json!({"dependencies": {"next": "14.0.0"}}));
        let settings = DependencyUpdaterSettings {
            update_deps: false,
            audit: false,
        };

        let manager = PluginManager::new(PluginManagerConfig::isolated());
        manager
            .load_export(export(settings, Arc::new(lookup())), PluginOrigin::Inline)
            .await
            .unwrap();

        let input = HookContext::new()
            .with_string(keys::FRAMEWORK, "next")
            .with_string(keys::PROJECT_PATH, &dir.path().to_string_lossy());
        let ctx = manager.execute_hook(LifecyclePoint::AfterClone, input.clone()).await;

        assert_eq!(ctx, input);
        let raw = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(raw.contains("14.0.0"));
    }
}
