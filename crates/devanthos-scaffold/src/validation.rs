//! Project name validation.

use devanthos_core::error::AppError;
use devanthos_core::result::AppResult;

/// Longest accepted project name.
pub const MAX_PROJECT_NAME_LEN: usize = 50;

/// Validates a project name and returns its normalised (trimmed, lower-case) form.
///
/// Accepted names are non-empty, contain only ASCII letters, digits, `-` and
/// `_`, do not start with `-` or `_`, and are at most 50 characters long.
pub fn validate_project_name(input: &str) -> AppResult<String> {
    let name = input.trim();

    if name.is_empty() {
        return Err(AppError::validation("Please enter a project name"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation(
            "Project name may only contain letters, numbers, hyphens and underscores",
        ));
    }

    if name.starts_with('-') || name.starts_with('_') {
        return Err(AppError::validation(
            "Project name cannot start with a hyphen or underscore",
        ));
    }

    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(AppError::validation(format!(
            "Project name is too long (maximum {MAX_PROJECT_NAME_LEN} characters)"
        )));
    }

    Ok(name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use devanthos_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_valid_names_are_normalised() {
        assert_eq!(validate_project_name("  My-Site_2 ").unwrap(), "my-site_2");
        assert_eq!(validate_project_name("a").unwrap(), "a");
    }

    #[test]
    fn test_rejected_names() {
        for bad in ["", "   ", "my site", "café", "-lead", "_lead", "a/b", "../x"] {
            let err = validate_project_name(bad).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation, "accepted {bad:?}");
        }
    }

    #[test]
    fn test_length_limit() {
        assert!(validate_project_name(&"a".repeat(50)).is_ok());
        assert!(validate_project_name(&"a".repeat(51)).is_err());
    }
}
