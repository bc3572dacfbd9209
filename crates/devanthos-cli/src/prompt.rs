//! Interactive questions for `new`.

use std::collections::BTreeMap;

use devanthos_core::config::TemplateConfig;
use devanthos_core::error::AppError;
use devanthos_scaffold::validate_project_name;

fn input_error(e: dialoguer::Error) -> AppError {
    AppError::internal(format!("Input error: {}", e))
}

/// Asks for the project name until it validates.
pub fn project_name(default: &str) -> Result<String, AppError> {
    let name: String = dialoguer::Input::new()
        .with_prompt("Project name")
        .default(default.to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            validate_project_name(input)
                .map(|_| ())
                .map_err(|e| e.message)
        })
        .interact_text()
        .map_err(input_error)?;
    validate_project_name(&name)
}

/// Lets the user pick a framework from the catalogue.
pub fn framework(catalog: &BTreeMap<String, TemplateConfig>) -> Result<String, AppError> {
    let ids: Vec<&String> = catalog.keys().collect();
    let labels: Vec<String> = catalog
        .iter()
        .map(|(id, template)| format!("{:<8} {}", id, template.description))
        .collect();

    let index = dialoguer::Select::new()
        .with_prompt("Which framework do you want to use?")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(input_error)?;

    ids.get(index)
        .map(|id| id.to_string())
        .ok_or_else(|| AppError::internal("Selection out of range"))
}

/// Asks whether to install dependencies.
pub fn install(default: bool) -> Result<bool, AppError> {
    dialoguer::Confirm::new()
        .with_prompt("Install dependencies automatically?")
        .default(default)
        .interact()
        .map_err(input_error)
}
