//! Project creation: the interactive wizard and the scaffold run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::output;
use crate::prompt;
use devanthos_core::config::AppConfig;
use devanthos_core::error::AppError;
use devanthos_scaffold::{
    PackageManagerInstaller, ScaffoldRequest, ScaffoldWorkflow, TarballFetcher,
    validate_project_name,
};

/// Archive downloads give up after this long.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Arguments for `new`
#[derive(Debug, Default, Args)]
pub struct NewArgs {
    /// Project name (prompted when omitted)
    pub name: Option<String>,

    /// Framework id: astro, next, expo or a configured template
    #[arg(short, long)]
    pub framework: Option<String>,

    /// Install dependencies after cloning
    #[arg(long, conflicts_with = "no_install")]
    pub install: bool,

    /// Skip dependency installation
    #[arg(long)]
    pub no_install: bool,

    /// Accept defaults instead of prompting
    #[arg(short, long)]
    pub yes: bool,

    /// Additional plugin manifest file or directory
    #[arg(long = "plugin-path")]
    pub plugin_path: Vec<PathBuf>,

    /// Directory to create the project in
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

impl NewArgs {
    fn install_choice(&self) -> Option<bool> {
        match (self.install, self.no_install) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Execute the new command
pub async fn execute(args: &NewArgs, config: &AppConfig) -> Result<(), AppError> {
    println!("Devanthos: create a new project");
    crate::commands::update::notify_if_outdated(config).await;

    let catalog = config.template_catalog();

    let project_name = match &args.name {
        Some(name) => validate_project_name(name)?,
        None if args.yes => {
            return Err(AppError::validation("A project name is required with --yes"));
        }
        None => prompt::project_name("my-devanthos-app")?,
    };

    let framework = match &args.framework {
        Some(framework) => framework.trim().to_lowercase(),
        None if args.yes => {
            return Err(AppError::validation("A framework is required with --yes"));
        }
        None => prompt::framework(&catalog)?,
    };

    let install = match args.install_choice() {
        Some(install) => install,
        None if args.yes => true,
        None => prompt::install(true)?,
    };

    let plugins = super::plugin_manager(config, &args.plugin_path).await?;
    let workflow = ScaffoldWorkflow::new(
        plugins,
        Arc::new(TarballFetcher::new(DOWNLOAD_TIMEOUT)?),
        Arc::new(PackageManagerInstaller::new(Duration::from_secs(
            config.install.timeout_seconds,
        ))),
        catalog,
    );

    let dir = if args.dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        args.dir.clone()
    };
    let request = ScaffoldRequest {
        framework,
        project_name: project_name.clone(),
        parent_dir: dir,
        install,
    };

    let template = workflow.template(&request.framework)?.clone();
    println!("Downloading {} ({})...", template.description, template.repo);

    let outcome = workflow.run(&request).await?;
    output::print_success("Template downloaded");

    match (&outcome.install, &outcome.install_error) {
        (Some(done), _) => {
            output::print_success(&format!("Dependencies installed with {}", done.manager));
        }
        (None, Some(err)) => output::print_warning(&err.message),
        (None, None) => {}
    }

    println!();
    output::print_success(&format!("Project '{}' is ready", project_name));
    output::print_kv("Location", &outcome.project_path.display().to_string());
    println!();
    println!("Next steps:");
    println!("  cd {}", project_name);
    if outcome.install.is_none() {
        println!("  npm install  # or pnpm install");
    }
    println!("  npm run dev");

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::commands::{Cli, Commands};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("create-devanthos").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_default_command_is_new() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_new_flags() {
        let cli = parse(&[
            "new",
            "demo",
            "--framework",
            "next",
            "--no-install",
            "--plugin-path",
            "./plugins",
        ]);
        let Some(Commands::New(args)) = cli.command else {
            panic!("expected new");
        };
        assert_eq!(args.name.as_deref(), Some("demo"));
        assert_eq!(args.framework.as_deref(), Some("next"));
        assert_eq!(args.install_choice(), Some(false));
        assert_eq!(args.plugin_path.len(), 1);
    }

    #[test]
    fn test_install_flags_conflict() {
        let result = Cli::try_parse_from(["create-devanthos", "new", "--install", "--no-install"]);
        assert!(result.is_err());
    }
}
