//! The scaffold pipeline: clone, install and the lifecycle hooks around them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use devanthos_core::config::TemplateConfig;
use devanthos_core::error::AppError;
use devanthos_core::result::AppResult;
use devanthos_plugin::{HookContext, LifecyclePoint, PluginManager, hooks::context::keys};

use crate::install::{DependencyInstaller, InstallOutcome};
use crate::template::{self, TemplateFetcher};

/// What to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldRequest {
    /// Framework id from the template catalogue.
    pub framework: String,
    /// Validated project name, also the directory name.
    pub project_name: String,
    /// Directory the project directory is created in.
    pub parent_dir: PathBuf,
    /// Whether to install dependencies after cloning.
    pub install: bool,
}

impl ScaffoldRequest {
    /// Project directory, relative when `parent_dir` is.
    pub fn project_path(&self) -> PathBuf {
        self.parent_dir.join(&self.project_name)
    }

    /// Project directory resolved against the working directory.
    pub fn absolute_project_path(&self) -> AppResult<PathBuf> {
        Ok(std::path::absolute(self.project_path())?)
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct ScaffoldOutcome {
    /// Absolute project directory.
    pub project_path: PathBuf,
    /// Template that was cloned.
    pub template: TemplateConfig,
    /// Set when dependencies were installed.
    pub install: Option<InstallOutcome>,
    /// Set when installation was requested and failed.
    pub install_error: Option<AppError>,
    /// Context returned by the `onComplete` hooks.
    pub context: HookContext,
}

/// Runs one project creation through the plugin hooks.
///
/// Order: `beforeClone`, fetch, `afterClone`, then (when installing)
/// `beforeInstall`, install, `afterInstall`, and finally `onComplete`. A
/// fetch failure runs `onError` and ends the run. An install failure does
/// not; it is recorded under `installError` for the remaining hooks.
#[derive(Debug, Clone)]
pub struct ScaffoldWorkflow {
    plugins: Arc<PluginManager>,
    fetcher: Arc<dyn TemplateFetcher>,
    installer: Arc<dyn DependencyInstaller>,
    catalog: BTreeMap<String, TemplateConfig>,
}

impl ScaffoldWorkflow {
    /// Creates a workflow.
    pub fn new(
        plugins: Arc<PluginManager>,
        fetcher: Arc<dyn TemplateFetcher>,
        installer: Arc<dyn DependencyInstaller>,
        catalog: BTreeMap<String, TemplateConfig>,
    ) -> Self {
        Self {
            plugins,
            fetcher,
            installer,
            catalog,
        }
    }

    /// The plugin manager driving the hooks.
    pub fn plugins(&self) -> &Arc<PluginManager> {
        &self.plugins
    }

    /// Looks up the template for `framework`.
    pub fn template(&self, framework: &str) -> AppResult<&TemplateConfig> {
        self.catalog.get(framework).ok_or_else(|| {
            let available: Vec<&str> = self.catalog.keys().map(String::as_str).collect();
            AppError::validation(format!(
                "Framework \"{framework}\" is not supported. Available frameworks: {}",
                available.join(", ")
            ))
        })
    }

    /// Runs the pipeline.
    pub async fn run(&self, request: &ScaffoldRequest) -> AppResult<ScaffoldOutcome> {
        let template = self.template(&request.framework)?.clone();
        let project_path = request.absolute_project_path()?;

        let context = HookContext::new()
            .with_string(keys::FRAMEWORK, &request.framework)
            .with_string(keys::PROJECT_NAME, &request.project_name)
            .with_string(keys::PROJECT_PATH, &project_path.to_string_lossy())
            .with_bool(keys::INSTALL_DEPENDENCIES, request.install)
            .with_string(keys::TEMPLATE, &template.repo);

        let context = self.hook(LifecyclePoint::BeforeClone, context).await;

        if let Err(err) = template::clone_template(self.fetcher.as_ref(), &template, &project_path).await {
            let failed = context
                .with_string(keys::ERROR, &err.message)
                .with_string(keys::STAGE, "clone");
            self.hook(LifecyclePoint::OnError, failed).await;
            return Err(err);
        }
        info!(path = %project_path.display(), repo = %template.repo, "Template cloned");

        let mut context = self.hook(LifecyclePoint::AfterClone, context).await;

        let mut install = None;
        let mut install_error = None;
        if request.install {
            context = self.hook(LifecyclePoint::BeforeInstall, context).await;
            match self.installer.install(&project_path).await {
                Ok(outcome) => {
                    context.insert(keys::PACKAGE_MANAGER, json!(outcome.manager.command()));
                    install = Some(outcome);
                }
                Err(err) => {
                    warn!(error = %err, "Dependency installation failed");
                    context.insert(keys::INSTALL_ERROR, json!(err.message));
                    install_error = Some(err);
                }
            }
            context = self.hook(LifecyclePoint::AfterInstall, context).await;
        }

        let context = self.hook(LifecyclePoint::OnComplete, context).await;

        Ok(ScaffoldOutcome {
            project_path,
            template,
            install,
            install_error,
            context,
        })
    }

    async fn hook(&self, point: LifecyclePoint, context: HookContext) -> HookContext {
        self.plugins.execute_hook(point, context).await
    }
}
