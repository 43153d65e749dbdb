//! # Module Installer
//!
//! Drives the update-and-install pipeline over every configured module:
//!
//! 1. ask the module's installer whether a newer version exists,
//! 2. install it (fetch → normalize → overlay → hook for generic modules,
//!    the package manager for registry modules),
//! 3. record the new version in the ledger, then in the in-memory state.
//!
//! Modules are processed strictly one after another, all sharing one scratch
//! directory. A failure anywhere in a module's pipeline is logged with the
//! module's name and the batch moves on; nothing is persisted for the failed
//! module, so the next run simply tries again.

use colored::Colorize;
use std::path::Path;

use crate::libs::artifact_fetcher::ProgressFactory;
use crate::libs::context::EnvironmentState;
use crate::libs::http_client::HttpClient;
use crate::libs::paths::EnvironmentLayout;
use crate::libs::process_runner::ProcessRunner;
use crate::libs::state_ledger::StateLedger;
use crate::libs::utilities::file_operations::{copy_tree, remove_path};
use crate::libs::utilities::platform::{HOOK_SCRIPT, hook_command};
use crate::schemas::errors::ModuleError;
use crate::schemas::module_spec::ModuleSpec;
use crate::schemas::pipeline::{InstallOutcome, PendingUpdate};
use crate::schemas::version_token::VersionToken;
use crate::{log_debug, log_error, log_info, log_warn};

/// Shared collaborators for one install batch.
pub struct InstallContext<'a> {
    pub layout: &'a EnvironmentLayout,
    pub http: &'a dyn HttpClient,
    pub runner: &'a dyn ProcessRunner,
    pub progress: ProgressFactory<'a>,
}

/// One installable module. Implemented per module kind in `installers`.
pub trait Module {
    fn spec(&self) -> &ModuleSpec;

    /// `Some` when a version newer than `current` is available.
    fn check_version(
        &self,
        ctx: &InstallContext<'_>,
        current: &VersionToken,
    ) -> Result<Option<PendingUpdate>, ModuleError>;

    fn install(&self, ctx: &InstallContext<'_>, update: &PendingUpdate) -> Result<InstallOutcome, ModuleError>;
}

/// What happened to each module of a batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// `(name, version)` of every module installed in this run.
    pub installed: Vec<(String, String)>,
    pub up_to_date: Vec<String>,
    /// `(name, error chain)` of every module that failed.
    pub failed: Vec<(String, String)>,
}

/// Copies `addons/<module>` over a freshly installed module directory.
/// Files are overwritten, directories created, nothing is ever deleted.
pub fn apply_overlay(addon_dir: &Path, module_dir: &Path) -> Result<usize, ModuleError> {
    if !addon_dir.is_dir() {
        log_debug!("[Install] No addons at {}", addon_dir.display());
        return Ok(0);
    }
    let copied = copy_tree(addon_dir, module_dir).map_err(ModuleError::io("cannot apply addons from", addon_dir))?;
    log_info!(
        "[Install] Applied {} addon file(s) from {}",
        copied.to_string().bold(),
        addon_dir.display().to_string().cyan()
    );
    Ok(copied)
}

/// Runs the module's one-shot setup script, if it ships one, from inside the
/// module directory, then deletes it. Returns whether a script was found.
///
/// A failing script is only a warning: the module's files are already in place.
pub fn run_post_install_hook(module_dir: &Path) -> Result<bool, ModuleError> {
    let script = module_dir.join(HOOK_SCRIPT);
    if !script.is_file() {
        return Ok(false);
    }

    log_info!("[Install] Running {}", script.display().to_string().cyan());
    match hook_command(&script).current_dir(module_dir).status() {
        Ok(status) if status.success() => log_debug!("[Install] {} finished", HOOK_SCRIPT),
        Ok(status) => log_warn!("[Install] {} exited with {}", HOOK_SCRIPT, status),
        Err(e) => log_warn!("[Install] Could not run {}: {}", HOOK_SCRIPT, e),
    }

    remove_path(&script).map_err(ModuleError::io("cannot remove", &script))?;
    Ok(true)
}

/// Declared activation paths that do not exist under a freshly installed module.
/// Usually a sign the vendor changed the archive layout.
pub fn missing_activation_paths<'p>(module_dir: &Path, activation_paths: &'p [String]) -> Vec<&'p str> {
    activation_paths
        .iter()
        .map(String::as_str)
        .filter(|relative| !module_dir.join(relative).exists())
        .collect()
}

/// Full error chain on one line: `outer: inner: root cause`.
fn error_chain(error: &ModuleError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = std::error::Error::source(cause);
    }
    message
}

/// Checks and, if needed, installs one module. `Ok(None)` means up to date.
fn process_module(
    ctx: &InstallContext<'_>,
    state: &mut EnvironmentState,
    module: &dyn Module,
    ledger: &StateLedger,
) -> Result<Option<VersionToken>, ModuleError> {
    let spec = module.spec();
    let current = state.version_of(&spec.name);
    log_debug!("[Install] Checking {} (installed: {})", spec.name, current);

    let Some(update) = module.check_version(ctx, &current)? else {
        return Ok(None);
    };

    log_info!("[Install] Installing {} {}", spec.name.bold(), update.version.to_string().green());
    let outcome = module.install(ctx, &update)?;
    let module_dir = ctx.layout.module_dir(&spec.directory_name());
    for missing in missing_activation_paths(&module_dir, &outcome.activation_paths) {
        log_warn!(
            "[Install] {} declares activation path '{}', which {} does not contain; unfold will skip it",
            spec.name.bold(),
            missing.yellow(),
            module_dir.display()
        );
    }

    ledger.record_version(spec.category(), &spec.name, &outcome.version)?;
    state.record(&spec.name, outcome.version.clone());
    Ok(Some(outcome.version))
}

/// Runs the pipeline over `modules`, in order. Never fails as a whole.
///
/// The scratch directory is cleared before the first module and removed
/// after the last one.
///
/// # Arguments
/// * `ctx`: Layout and the HTTP, process and progress collaborators.
/// * `state`: Live versions; updated after each successful install.
/// * `modules`: The enabled modules, in configuration order.
/// * `ledger`: Writes each new version back to `modules.json`.
///
/// # Returns
/// A `BatchReport` sorting every module into installed, up to date or failed.
pub fn install_modules(
    ctx: &InstallContext<'_>,
    state: &mut EnvironmentState,
    modules: &[Box<dyn Module>],
    ledger: &StateLedger,
) -> BatchReport {
    let scratch = &ctx.layout.scratch_dir;
    if let Err(e) = remove_path(scratch) {
        log_warn!("[Install] Could not clear leftover {}: {}", scratch.display(), e);
    }

    let mut report = BatchReport::default();
    for module in modules {
        let name = module.spec().name.clone();
        match process_module(ctx, state, &**module, ledger) {
            Ok(Some(version)) => {
                log_info!("[Install] {} {} installed", name.bold(), version.to_string().green());
                report.installed.push((name, version.to_string()));
            }
            Ok(None) => {
                log_info!("[Install] {} is up to date", name.bold());
                report.up_to_date.push(name);
            }
            Err(e) => {
                let chain = error_chain(&e);
                log_error!("[Install] {} failed: {}", name.bold(), chain.red());
                report.failed.push((name, chain));
            }
        }
    }

    if let Err(e) = remove_path(scratch) {
        log_warn!("[Install] Could not remove {}: {}", scratch.display(), e);
    }
    log_info!(
        "[Install] Installation completed: {} installed, {} up to date, {} failed",
        report.installed.len().to_string().green(),
        report.up_to_date.len(),
        if report.failed.is_empty() {
            "0".normal()
        } else {
            report.failed.len().to_string().red()
        }
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::http_client::fake::FakeHttp;
    use crate::libs::process_runner::fake::ScriptedRunner;
    use crate::libs::utilities::progress::{ProgressSink, SilentProgress};
    use crate::schemas::modules_file::{ModuleCategory, ModuleEntry};
    use std::fs;

    /// A module whose check and install outcomes are scripted.
    struct ScriptedModule {
        spec: ModuleSpec,
        latest: &'static str,
        fail_check: bool,
        fail_install: bool,
    }

    impl ScriptedModule {
        fn new(name: &str, latest: &'static str) -> Self {
            let entry = ModuleEntry {
                name: name.to_string(),
                enabled: true,
                version: "0.0".to_string(),
                url: None,
                pattern: None,
                paths: vec![],
            };
            ScriptedModule {
                spec: ModuleSpec::from_entry(ModuleCategory::Npm, &entry).unwrap(),
                latest,
                fail_check: false,
                fail_install: false,
            }
        }
    }

    impl Module for ScriptedModule {
        fn spec(&self) -> &ModuleSpec {
            &self.spec
        }

        fn check_version(
            &self,
            _ctx: &InstallContext<'_>,
            current: &VersionToken,
        ) -> Result<Option<PendingUpdate>, ModuleError> {
            if self.fail_check {
                return Err(ModuleError::VersionRetrieval {
                    source_name: self.spec.name.clone(),
                    reason: "unreachable".to_string(),
                });
            }
            let latest = VersionToken::parse(self.latest)?;
            Ok((latest > *current).then_some(PendingUpdate {
                version: latest,
                locator: None,
            }))
        }

        fn install(&self, _ctx: &InstallContext<'_>, update: &PendingUpdate) -> Result<InstallOutcome, ModuleError> {
            if self.fail_install {
                return Err(ModuleError::ToolFailure {
                    tool: "npm".to_string(),
                    output: "npm ERR! 404".to_string(),
                });
            }
            Ok(InstallOutcome {
                version: update.version.clone(),
                activation_paths: vec![],
            })
        }
    }

    fn silent(_: &str) -> Box<dyn ProgressSink> {
        Box::new(SilentProgress)
    }

    const DOCUMENT: &str = r#"{
  "registry-npm": [
    {"name": "a", "enabled": true, "version": "0.0"},
    {"name": "b", "enabled": true, "version": "0.0"},
    {"name": "c", "enabled": true, "version": "0.0"}
  ]
}"#;

    fn run_batch(modules: Vec<Box<dyn Module>>) -> (tempfile::TempDir, BatchReport, EnvironmentState, serde_json::Value) {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvironmentLayout::new(dir.path());
        fs::write(&layout.modules_file, DOCUMENT).unwrap();
        fs::create_dir_all(layout.scratch_dir.join("leftover")).unwrap();

        let http = FakeHttp::default();
        let runner = ScriptedRunner::default();
        let ctx = InstallContext {
            layout: &layout,
            http: &http,
            runner: &runner,
            progress: &silent,
        };
        let ledger = StateLedger::new(&layout.modules_file);
        let specs: Vec<ModuleSpec> = modules.iter().map(|m| m.spec().clone()).collect();
        let mut state = EnvironmentState::from_modules(&specs);

        let report = install_modules(&ctx, &mut state, &modules, &ledger);
        assert!(!layout.scratch_dir.exists());
        let document = serde_json::from_str(&fs::read_to_string(&layout.modules_file).unwrap()).unwrap();
        (dir, report, state, document)
    }

    #[test]
    fn a_failing_module_does_not_stop_the_batch() {
        let mut a = ScriptedModule::new("a", "2.0");
        a.fail_install = true;
        let b = ScriptedModule::new("b", "1.5");

        let (_dir, report, state, document) = run_batch(vec![Box::new(a), Box::new(b)]);

        assert_eq!(report.installed, vec![("b".to_string(), "1.5".to_string())]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("npm ERR! 404"));
        assert_eq!(document["registry-npm"][0]["version"], "0.0");
        assert_eq!(document["registry-npm"][1]["version"], "1.5");
        assert_eq!(state.version_of("a").to_string(), "0.0");
        assert_eq!(state.version_of("b").to_string(), "1.5");
    }

    #[test]
    fn up_to_date_and_unreachable_modules_are_reported_separately() {
        let current = ScriptedModule::new("a", "0.0");
        let mut broken = ScriptedModule::new("b", "9.9");
        broken.fail_check = true;
        let fresh = ScriptedModule::new("c", "0.1");

        let (_dir, report, _state, document) =
            run_batch(vec![Box::new(current), Box::new(broken), Box::new(fresh)]);

        assert_eq!(report.up_to_date, vec!["a".to_string()]);
        assert_eq!(report.failed[0].0, "b");
        assert_eq!(report.installed, vec![("c".to_string(), "0.1".to_string())]);
        assert_eq!(document["registry-npm"][2]["version"], "0.1");
    }

    #[test]
    fn overlay_copies_over_without_deleting() {
        let dir = tempfile::tempdir().unwrap();
        let addons = dir.path().join("addons/git");
        let module = dir.path().join("programs/git");
        fs::create_dir_all(addons.join("etc")).unwrap();
        fs::write(addons.join("etc/gitconfig"), "[core]").unwrap();
        fs::create_dir_all(module.join("bin")).unwrap();
        fs::write(module.join("bin/git"), "binary").unwrap();

        assert_eq!(apply_overlay(&addons, &module).unwrap(), 1);
        assert_eq!(fs::read_to_string(module.join("etc/gitconfig")).unwrap(), "[core]");
        assert_eq!(fs::read_to_string(module.join("bin/git")).unwrap(), "binary");
        assert_eq!(apply_overlay(&dir.path().join("addons/none"), &module).unwrap(), 0);
    }

    #[test]
    fn reports_activation_paths_absent_after_install() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        let declared = vec![".".to_string(), "bin".to_string(), "cmd".to_string()];
        assert_eq!(missing_activation_paths(dir.path(), &declared), vec!["cmd"]);
    }

    #[test]
    fn missing_hook_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!run_post_install_hook(dir.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn hook_runs_in_the_module_directory_and_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(HOOK_SCRIPT), "echo configured > marker.txt\nexit 3\n").unwrap();

        assert!(run_post_install_hook(dir.path()).unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("marker.txt")).unwrap().trim(), "configured");
        assert!(!dir.path().join(HOOK_SCRIPT).exists());
    }

    #[test]
    fn error_chain_includes_sources() {
        let error = ModuleError::io("cannot create", "/x")(std::io::Error::other("disk full"));
        assert_eq!(error_chain(&error), "cannot create (/x): disk full");
    }
}
