// Loads `config.json` and `modules.json` into an `EnvironmentContext`.
//
// Module entries are converted and validated one by one: disabled entries are
// dropped silently, malformed ones (wrong shape or invalid values) are dropped
// with a warning. A bad entry never prevents the
// rest of the document from loading; only an unreadable or unparsable
// document is an error.

use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::libs::context::{EnvironmentContext, EnvironmentState};
use crate::libs::paths::EnvironmentLayout;
use crate::schemas::environment_config::EnvironmentConfig;
use crate::schemas::errors::ConfigError;
use crate::schemas::module_spec::ModuleSpec;
use crate::schemas::modules_file::{ModuleCategory, ModuleEntry, ModulesDocument};
use crate::{log_debug, log_warn};

/// Reads and deserializes one JSON document.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Turns the raw document into validated specs, in document order
/// (generic, then npm, then composer).
pub fn collect_modules(document: &ModulesDocument) -> Vec<ModuleSpec> {
    let mut modules = Vec::new();
    for category in ModuleCategory::ALL {
        for (index, raw) in document.entries(category).iter().enumerate() {
            let entry = match ModuleEntry::from_value(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    log_warn!(
                        "[Config] Entry #{} of '{}' is malformed ({}). Skipping it.",
                        index + 1,
                        category,
                        e.to_string().yellow()
                    );
                    continue;
                }
            };
            if !entry.enabled {
                log_debug!("[Config] Skipping disabled module '{}' ({})", entry.name, category);
                continue;
            }
            match ModuleSpec::from_entry(category, &entry) {
                Ok(spec) => modules.push(spec),
                Err(e) => log_warn!("[Config] {} Skipping it.", e.to_string().yellow()),
            }
        }
    }
    modules
}

/// Expands `~`/`$VARS` in the projects directory and anchors relative values at the root.
pub fn resolve_projects_dir(root: &Path, configured: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(configured).map_err(|e| ConfigError::Expand {
        value: configured.to_string(),
        reason: e.to_string(),
    })?;
    let path = PathBuf::from(expanded.as_ref());
    Ok(if path.is_absolute() { path } else { root.join(path) })
}

/// Builds the run context for an initialized environment root.
///
/// # Arguments
/// * `layout`: Paths derived from the root; moved into the context.
///
/// # Returns
/// * `Ok(EnvironmentContext)` holding only enabled, valid modules.
/// * `Err(ConfigError)` if a document is missing or is not JSON at all, or
///   if `projectsDirectory` cannot be expanded. Bad entries are not errors.
pub fn load_context(layout: EnvironmentLayout) -> Result<EnvironmentContext, ConfigError> {
    log_debug!(
        "[Config] Loading {} and {}",
        layout.modules_file.display(),
        layout.config_file.display()
    );

    let document: ModulesDocument = read_json(&layout.modules_file)?;
    let modules = collect_modules(&document);
    log_debug!("[Config] {} enabled module(s) loaded", modules.len());

    let config: EnvironmentConfig = read_json(&layout.config_file)?;
    let projects_dir = resolve_projects_dir(&layout.root, &config.projects_directory)?;

    Ok(EnvironmentContext {
        state: EnvironmentState::from_modules(&modules),
        layout,
        config,
        modules,
        projects_dir,
    })
}
