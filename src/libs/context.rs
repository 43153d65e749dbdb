// The explicit context threaded through every command: layout, settings,
// the configured modules and the live version state.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::libs::paths::EnvironmentLayout;
use crate::schemas::environment_config::EnvironmentConfig;
use crate::schemas::module_spec::ModuleSpec;
use crate::schemas::version_token::VersionToken;

/// Module identity → installed version.
///
/// Seeded from `modules.json` at start-up and updated in memory after every
/// successful install, right after the ledger has flushed the same version to disk.
#[derive(Debug, Default, Clone)]
pub struct EnvironmentState {
    versions: HashMap<String, VersionToken>,
}

impl EnvironmentState {
    pub fn from_modules(modules: &[ModuleSpec]) -> Self {
        EnvironmentState {
            versions: modules
                .iter()
                .map(|m| (m.name.clone(), m.current_version.clone()))
                .collect(),
        }
    }

    /// Recorded version, `0.0` for anything unknown.
    pub fn version_of(&self, identity: &str) -> VersionToken {
        self.versions.get(identity).cloned().unwrap_or_default()
    }

    pub fn record(&mut self, identity: &str, version: VersionToken) {
        self.versions.insert(identity.to_string(), version);
    }
}

pub struct EnvironmentContext {
    pub layout: EnvironmentLayout,
    pub config: EnvironmentConfig,
    /// Read-only for the whole run.
    pub modules: Vec<ModuleSpec>,
    pub state: EnvironmentState,
    /// Absolute projects directory, already expanded.
    pub projects_dir: PathBuf,
}

impl EnvironmentContext {
    /// Directories of installed modules that `unfold` may add to PATH,
    /// in configuration order. Existence is checked by the activation machine.
    pub fn activation_candidates(&self) -> Vec<PathBuf> {
        self.modules
            .iter()
            .flat_map(|module| {
                let module_dir = self.layout.module_dir(&module.directory_name());
                module
                    .activation_paths()
                    .iter()
                    .map(move |relative| module_dir.join(relative))
            })
            .collect()
    }
}
