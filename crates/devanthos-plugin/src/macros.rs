//! Convenience macros for plugin development.

/// Builds a [`HookContext`](crate::hooks::context::HookContext) from key/value pairs.
///
/// Values go through `serde_json::json!`, so literals, expressions and nested
/// JSON all work.
///
/// # Example
/// ```rust,ignore
/// let ctx = hook_context! {
///     "framework" => "astro",
///     "projectName" => name,
///     "installDependencies" => true,
/// };
/// ```
#[macro_export]
macro_rules! hook_context {
    () => {
        $crate::hooks::context::HookContext::new()
    };
    ($($key:expr => $value:tt),* $(,)?) => {{
        let mut context = $crate::hooks::context::HookContext::new();
        $(
            context.insert($key, $crate::__serde_json::json!($value));
        )*
        context
    }};
}
