// Schema for `config.json`, the environment-wide settings document.

use serde::{Deserialize, Serialize};

/// Settings that apply to the whole environment rather than to a module.
///
/// ```json
/// { "projectsDirectory": "~/work/projects" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Folder opened by `envfold projects`. `~` and `$VARS` are expanded;
    /// relative paths are taken from the environment root.
    pub projects_directory: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            projects_directory: "projects".to_string(),
        }
    }
}
