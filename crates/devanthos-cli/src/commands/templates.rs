//! Template catalogue listing.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use devanthos_core::config::AppConfig;
use devanthos_core::error::AppError;

/// One catalogue entry.
#[derive(Debug, Serialize, Tabled)]
pub struct TemplateRow {
    /// Framework id
    #[tabled(rename = "Framework")]
    pub framework: String,
    /// Source repository
    #[tabled(rename = "Repository")]
    pub repo: String,
    /// Description
    #[tabled(rename = "Description")]
    pub description: String,
}

/// Execute the templates command
pub fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let rows: Vec<TemplateRow> = config
        .template_catalog()
        .into_iter()
        .map(|(framework, template)| TemplateRow {
            framework,
            repo: template.repo,
            description: template.description,
        })
        .collect();

    output::print_list(&rows, format);
    Ok(())
}
