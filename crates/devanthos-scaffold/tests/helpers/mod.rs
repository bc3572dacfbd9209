//! Fakes for running the scaffold workflow without network or package managers.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use devanthos_core::config::{TemplateConfig, builtin_templates};
use devanthos_core::error::AppError;
use devanthos_core::result::AppResult;
use devanthos_plugin::prelude::*;
use devanthos_scaffold::install::{DependencyInstaller, InstallOutcome, PackageManager};
use devanthos_scaffold::{ScaffoldRequest, ScaffoldWorkflow, TemplateFetcher};

/// Writes a minimal project, or fails with a not-found error.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pub fail: bool,
}

#[async_trait]
impl TemplateFetcher for FakeFetcher {
    async fn fetch(&self, template: &TemplateConfig, target: &Path) -> AppResult<()> {
        if self.fail {
            return Err(AppError::not_found(format!(
                "Template '{}' was not found",
                template.repo
            )));
        }
        tokio::fs::write(target.join("package.json"), "{\"name\":\"demo\"}").await?;
        Ok(())
    }
}

/// Succeeds with pnpm or fails with an install error.
#[derive(Debug, Default)]
pub struct FakeInstaller {
    pub fail: bool,
}

#[async_trait]
impl DependencyInstaller for FakeInstaller {
    async fn install(&self, _project: &Path) -> AppResult<InstallOutcome> {
        if self.fail {
            return Err(AppError::install("all package managers failed"));
        }
        Ok(InstallOutcome {
            manager: PackageManager::Pnpm,
        })
    }
}

/// Hook invocations as `point` or `point:key=value` for selected keys.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Registers a plugin that journals every lifecycle point it sees.
pub async fn recorder(manager: &PluginManager, journal: &Journal) {
    let mut export = PluginExport::new("recorder");
    for point in LifecyclePoint::ALL {
        let journal = journal.clone();
        export = export.on_fn(point, move |ctx: HookContext| {
            let journal = journal.clone();
            async move {
                let mut entry = point.as_str().to_string();
                for key in [keys::STAGE, keys::PACKAGE_MANAGER, keys::INSTALL_ERROR] {
                    if let Some(value) = ctx.get_str(key) {
                        entry.push_str(&format!(":{key}={value}"));
                    }
                }
                journal.lock().unwrap().push(entry);
                Ok::<_, anyhow::Error>(None)
            }
        });
    }
    manager
        .load_export(export, PluginOrigin::Inline)
        .await
        .unwrap();
}

/// Workflow over the fakes with the built-in catalogue.
pub fn workflow(
    manager: Arc<PluginManager>,
    fetch_fails: bool,
    install_fails: bool,
) -> ScaffoldWorkflow {
    ScaffoldWorkflow::new(
        manager,
        Arc::new(FakeFetcher { fail: fetch_fails }),
        Arc::new(FakeInstaller {
            fail: install_fails,
        }),
        builtin_templates(),
    )
}

/// Request for `demo` under `parent`.
pub fn request(parent: &Path, install: bool) -> ScaffoldRequest {
    ScaffoldRequest {
        framework: "next".to_string(),
        project_name: "demo".to_string(),
        parent_dir: parent.to_path_buf(),
        install,
    }
}
