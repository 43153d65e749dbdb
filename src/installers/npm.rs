//! # npm Installer
//!
//! Installs global Node.js packages with the environment's own npm when the
//! `nodejs` module is installed, or with whatever npm is on PATH otherwise.

use colored::Colorize;
use std::path::PathBuf;

use crate::libs::module_installer::{InstallContext, Module};
use crate::libs::utilities::platform::locate_tool;
use crate::libs::version_oracle::detect_npm;
use crate::schemas::errors::ModuleError;
use crate::schemas::module_spec::ModuleSpec;
use crate::schemas::pipeline::{InstallOutcome, PendingUpdate};
use crate::schemas::version_token::VersionToken;
use crate::{log_debug, log_warn};

/// Module directory that bundles npm.
const NODE_MODULE: &str = "nodejs";

/// npm prefixes every error line with this marker, sometimes with exit code 0.
pub fn npm_reported_error(stderr: &str) -> bool {
    stderr.contains("ERR!")
}

pub struct NpmModule {
    spec: ModuleSpec,
}

impl NpmModule {
    pub fn new(spec: ModuleSpec) -> Self {
        NpmModule { spec }
    }

    fn npm(ctx: &InstallContext<'_>) -> Result<PathBuf, ModuleError> {
        locate_tool("npm", &ctx.layout.module_dir(NODE_MODULE))
            .ok_or(ModuleError::PrerequisiteMissing { tool: "npm" })
    }
}

impl Module for NpmModule {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn check_version(
        &self,
        ctx: &InstallContext<'_>,
        current: &VersionToken,
    ) -> Result<Option<PendingUpdate>, ModuleError> {
        let npm = Self::npm(ctx)?;
        detect_npm(ctx.runner, &npm, &self.spec.name, current)
    }

    fn install(&self, ctx: &InstallContext<'_>, update: &PendingUpdate) -> Result<InstallOutcome, ModuleError> {
        let npm = Self::npm(ctx)?;
        let output = ctx.runner.run(&npm, &["install", "-g", &self.spec.name])?;

        if npm_reported_error(&output.stderr) || !output.success {
            return Err(ModuleError::ToolFailure {
                tool: "npm".to_string(),
                output: output.failure_report(),
            });
        }
        if !output.stderr.trim().is_empty() {
            log_warn!("[npm] {}", output.stderr.trim().yellow());
        }
        log_debug!("[npm] {}", output.stdout.trim());

        Ok(InstallOutcome {
            version: update.version.clone(),
            activation_paths: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::http_client::fake::FakeHttp;
    use crate::libs::paths::EnvironmentLayout;
    use crate::libs::process_runner::fake::ScriptedRunner;
    use crate::libs::utilities::platform::launcher_names;
    use crate::libs::utilities::progress::{ProgressSink, SilentProgress};
    use crate::schemas::modules_file::{ModuleCategory, ModuleEntry};

    fn silent(_: &str) -> Box<dyn ProgressSink> {
        Box::new(SilentProgress)
    }

    fn module(name: &str) -> NpmModule {
        let entry = ModuleEntry {
            name: name.to_string(),
            enabled: true,
            version: "0.0".to_string(),
            url: None,
            pattern: None,
            paths: vec![],
        };
        NpmModule::new(ModuleSpec::from_entry(ModuleCategory::Npm, &entry).unwrap())
    }

    fn layout_with_bundled_npm() -> (tempfile::TempDir, EnvironmentLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvironmentLayout::new(dir.path());
        let node = layout.module_dir(NODE_MODULE);
        std::fs::create_dir_all(&node).unwrap();
        std::fs::write(node.join(launcher_names("npm").remove(0)), "").unwrap();
        (dir, layout)
    }

    #[test]
    fn err_marker_fails_the_install() {
        let (_dir, layout) = layout_with_bundled_npm();
        let http = FakeHttp::default();
        let runner = ScriptedRunner::default()
            .on("view left-pad version", "1.3.0\n", "")
            .on("install -g left-pad", "", "npm ERR! code E404\nnpm ERR! 404 Not Found");
        let ctx = InstallContext {
            layout: &layout,
            http: &http,
            runner: &runner,
            progress: &silent,
        };

        let m = module("left-pad");
        let update = m.check_version(&ctx, &VersionToken::never_installed()).unwrap().unwrap();
        let err = m.install(&ctx, &update).unwrap_err();
        assert!(matches!(err, ModuleError::ToolFailure { .. }));
        assert!(err.to_string().contains("E404"));
    }

    #[test]
    fn warnings_alone_do_not_fail() {
        let (_dir, layout) = layout_with_bundled_npm();
        let http = FakeHttp::default();
        let runner = ScriptedRunner::default().on("install -g eslint", "added 1 package", "npm WARN deprecated");
        let ctx = InstallContext {
            layout: &layout,
            http: &http,
            runner: &runner,
            progress: &silent,
        };
        let update = PendingUpdate {
            version: VersionToken::parse("9.0.0").unwrap(),
            locator: None,
        };
        let outcome = module("eslint").install(&ctx, &update).unwrap();
        assert_eq!(outcome.version.to_string(), "9.0.0");
        assert_eq!(runner.calls(), vec!["install -g eslint".to_string()]);
    }
}
