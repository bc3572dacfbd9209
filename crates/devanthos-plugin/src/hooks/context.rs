//! The context threaded through a hook chain.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys the host workflow writes into the context.
pub mod keys {
    /// Framework id chosen for the project (`"astro"`, `"next"`, ...).
    pub const FRAMEWORK: &str = "framework";
    /// Normalised project name.
    pub const PROJECT_NAME: &str = "projectName";
    /// Absolute project directory.
    pub const PROJECT_PATH: &str = "projectPath";
    /// Whether dependencies will be installed.
    pub const INSTALL_DEPENDENCIES: &str = "installDependencies";
    /// Description of the fetched template.
    pub const TEMPLATE: &str = "template";
    /// Package manager that completed the install.
    pub const PACKAGE_MANAGER: &str = "packageManager";
    /// Message of the failure that triggered `onError`.
    pub const ERROR: &str = "error";
    /// Workflow stage that failed.
    pub const STAGE: &str = "stage";
    /// Set by the bundled dependency updater.
    pub const DEPENDENCIES_UPDATED: &str = "dependenciesUpdated";
    /// Message of a failed, non-fatal dependency install.
    pub const INSTALL_ERROR: &str = "installError";
    /// Vulnerability count reported by the post-install audit.
    pub const AUDIT_VULNERABILITIES: &str = "auditVulnerabilities";
}

/// String-keyed JSON mapping passed to every handler of one hook chain.
///
/// Handler output is shallow-merged: keys returned by a handler replace
/// existing keys, other keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookContext {
    values: Map<String, Value>,
}

impl HookContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing map.
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Inserts a value.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, Value::String(value.to_string()))
    }

    /// Inserts a boolean value.
    pub fn with_bool(self, key: &str, value: bool) -> Self {
        self.with_data(key, Value::Bool(value))
    }

    /// Inserts or replaces a value in place.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.values.insert(key.to_string(), value)
    }

    /// Merges handler output over this context.
    ///
    /// Only JSON objects are merged; returns whether a merge happened.
    pub fn apply(&mut self, output: Value) -> bool {
        match output {
            Value::Object(patch) => {
                self.merge(patch);
                true
            }
            _ => false,
        }
    }

    /// Shallow merge: every key of `patch` overwrites the current value.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.values.insert(key, value);
        }
    }

    /// Gets a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Gets a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Gets a boolean value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Gets an integer value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the context holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consumes the context, returning the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Framework id.
    pub fn framework(&self) -> Option<&str> {
        self.get_str(keys::FRAMEWORK)
    }

    /// Project name.
    pub fn project_name(&self) -> Option<&str> {
        self.get_str(keys::PROJECT_NAME)
    }

    /// Project directory.
    pub fn project_path(&self) -> Option<PathBuf> {
        self.get_str(keys::PROJECT_PATH).map(PathBuf::from)
    }

    /// Whether the workflow installs dependencies.
    pub fn install_dependencies(&self) -> bool {
        self.get_bool(keys::INSTALL_DEPENDENCIES).unwrap_or(false)
    }

    /// Failure message set for `onError`.
    pub fn error(&self) -> Option<&str> {
        self.get_str(keys::ERROR)
    }
}

impl From<Map<String, Value>> for HookContext {
    fn from(values: Map<String, Value>) -> Self {
        Self::from_map(values)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_apply_object_overwrites_and_preserves() {
        let mut ctx = HookContext::new()
            .with_string("tag", "base")
            .with_bool("keep", true);

        assert!(ctx.apply(json!({"tag": "A", "note": "b"})));
        assert_eq!(ctx.get_str("tag"), Some("A"));
        assert_eq!(ctx.get_str("note"), Some("b"));
        assert_eq!(ctx.get_bool("keep"), Some(true));
    }

    #[test]
    fn test_apply_non_object_is_ignored() {
        let mut ctx = HookContext::new().with_string("tag", "base");
        let before = ctx.clone();

        assert!(!ctx.apply(json!("replace me")));
        assert!(!ctx.apply(json!([1, 2, 3])));
        assert!(!ctx.apply(Value::Null));
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut ctx = HookContext::new().with_data("meta", json!({"a": 1, "b": 2}));
        ctx.apply(json!({"meta": {"c": 3}}));
        assert_eq!(ctx.get("meta"), Some(&json!({"c": 3})));
    }

    #[test]
    fn test_typed_accessors() {
        let ctx = HookContext::new()
            .with_string(keys::FRAMEWORK, "astro")
            .with_string(keys::PROJECT_NAME, "site")
            .with_string(keys::PROJECT_PATH, "/tmp/site")
            .with_bool(keys::INSTALL_DEPENDENCIES, true);

        assert_eq!(ctx.framework(), Some("astro"));
        assert_eq!(ctx.project_name(), Some("site"));
        assert_eq!(ctx.project_path(), Some(PathBuf::from("/tmp/site")));
        assert!(ctx.install_dependencies());
        assert_eq!(ctx.error(), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let ctx = HookContext::new().with_string("framework", "next");
        assert_eq!(
            serde_json::to_value(&ctx).unwrap(),
            json!({"framework": "next"})
        );
    }
}
