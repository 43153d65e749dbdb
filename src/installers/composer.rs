//! # Composer Installer
//!
//! Installs global PHP packages (`namespace/package`) with
//! `composer global require`. Composer reports its progress on stderr, which
//! is streamed line by line into the progress bar.

use colored::Colorize;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::libs::module_installer::{InstallContext, Module};
use crate::libs::utilities::platform::locate_tool;
use crate::libs::utilities::progress::{INSTALL_LABEL, percent_of};
use crate::libs::version_oracle::detect_composer;
use crate::schemas::errors::ModuleError;
use crate::schemas::module_spec::ModuleSpec;
use crate::schemas::pipeline::{InstallOutcome, PendingUpdate};
use crate::schemas::version_token::VersionToken;
use crate::{log_debug, log_info};

/// Module directory that bundles composer.
const COMPOSER_MODULE: &str = "composer";

fn operations_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"Package operations:\s*(\d+)\s+install").ok())
        .as_ref()
}

/// Tracks `Package operations: N installs` and the `- Installing` lines after it.
#[derive(Debug, Default)]
pub struct ComposerProgress {
    total: Option<u64>,
    installed: u64,
}

impl ComposerProgress {
    /// Feeds one stderr line; returns the new percentage when it changed.
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        if let Some(captures) = operations_pattern().and_then(|p| p.captures(line)) {
            self.total = captures.get(1).and_then(|m| m.as_str().parse().ok());
            self.installed = 0;
            return Some(0);
        }
        if line.trim_start().starts_with("- Installing") {
            self.installed += 1;
            return self.total.map(|total| percent_of(self.installed, total));
        }
        None
    }
}

/// Composer has no error prefix; any mention of a failure means the require failed.
pub fn composer_reported_failure(output: &str) -> bool {
    output.contains("failed")
}

pub struct ComposerModule {
    spec: ModuleSpec,
    namespace: String,
    package: String,
}

impl ComposerModule {
    pub fn new(spec: ModuleSpec, namespace: String, package: String) -> Self {
        ComposerModule {
            spec,
            namespace,
            package,
        }
    }

    /// `namespace/package`, as composer expects it on the command line.
    fn identity(&self) -> String {
        format!("{}/{}", self.namespace, self.package)
    }

    fn composer(ctx: &InstallContext<'_>) -> Result<PathBuf, ModuleError> {
        locate_tool("composer", &ctx.layout.module_dir(COMPOSER_MODULE))
            .ok_or(ModuleError::PrerequisiteMissing { tool: "composer" })
    }
}

impl Module for ComposerModule {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn check_version(
        &self,
        ctx: &InstallContext<'_>,
        current: &VersionToken,
    ) -> Result<Option<PendingUpdate>, ModuleError> {
        let composer = Self::composer(ctx)?;
        detect_composer(ctx.runner, &composer, &self.identity(), current)
    }

    fn install(&self, ctx: &InstallContext<'_>, update: &PendingUpdate) -> Result<InstallOutcome, ModuleError> {
        let composer = Self::composer(ctx)?;
        let progress = (ctx.progress)(INSTALL_LABEL);
        let mut tracker = ComposerProgress::default();

        let output = ctx.runner.run_streaming(
            &composer,
            &["global", "require", &self.identity()],
            &mut |line| {
                log_debug!("[composer] {}", line);
                if let Some(percent) = tracker.observe(line) {
                    progress.update(percent);
                }
            },
        );
        progress.finish();
        let output = output?;

        let combined = output.combined();
        if composer_reported_failure(&combined) || !output.success {
            return Err(ModuleError::ToolFailure {
                tool: "composer".to_string(),
                output: output.failure_report(),
            });
        }
        log_info!(
            "[composer] {} required globally (vendor {})",
            self.package.bold(),
            self.namespace
        );

        Ok(InstallOutcome {
            version: update.version.clone(),
            activation_paths: Vec::new(),
        })
    }
}
