//! Project template catalogue configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A template snapshot source for one framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// GitHub repository in `owner/repo` form.
    pub repo: String,
    /// Short human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Templates shipped with the CLI, keyed by framework id.
pub fn builtin_templates() -> BTreeMap<String, TemplateConfig> {
    let mut templates = BTreeMap::new();
    templates.insert(
        "astro".to_string(),
        TemplateConfig {
            repo: "devanthos/astro-template-devanthos".to_string(),
            description: "Astro with TypeScript, Tailwind CSS and optimized components"
                .to_string(),
        },
    );
    templates.insert(
        "next".to_string(),
        TemplateConfig {
            repo: "devanthos/next-template-devanthos".to_string(),
            description: "Next.js with App Router, TypeScript and Tailwind CSS".to_string(),
        },
    );
    templates.insert(
        "expo".to_string(),
        TemplateConfig {
            repo: "devanthos/expo-template-devanthos".to_string(),
            description: "Expo with React Native, TypeScript, NativeWind and navigation"
                .to_string(),
        },
    );
    templates
}
