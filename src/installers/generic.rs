//! # Generic Installer
//!
//! Installs tools published as downloadable artifacts on a vendor page:
//! Git, Node.js, PHP, editors and the like.
//!
//! ## Installation Workflow
//!
//! 1. **Version check** - scrape the configured page (or its redirect target)
//!    with the module's pattern and keep the highest version
//! 2. **Fetch** - download the artifact into the scratch directory
//! 3. **Normalize** - unpack it into `programs/<name>`, replacing what was there
//! 4. **Overlay** - copy `addons/<name>` over the fresh install
//! 5. **Hook** - run and delete the module's `env-run` script, if any

use crate::libs::archive_normalizer::normalize;
use crate::libs::artifact_fetcher::fetch;
use crate::libs::module_installer::{InstallContext, Module, apply_overlay, run_post_install_hook};
use crate::libs::version_oracle::detect_generic;
use crate::schemas::errors::ModuleError;
use crate::schemas::module_spec::{GenericSource, ModuleSpec};
use crate::schemas::pipeline::{InstallOutcome, PendingUpdate};
use crate::schemas::version_token::VersionToken;

pub struct GenericModule {
    spec: ModuleSpec,
    source: GenericSource,
}

impl GenericModule {
    pub fn new(spec: ModuleSpec, source: GenericSource) -> Self {
        GenericModule { spec, source }
    }
}

impl Module for GenericModule {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn check_version(
        &self,
        ctx: &InstallContext<'_>,
        current: &VersionToken,
    ) -> Result<Option<PendingUpdate>, ModuleError> {
        detect_generic(ctx.http, &self.source, current)
    }

    fn install(&self, ctx: &InstallContext<'_>, update: &PendingUpdate) -> Result<InstallOutcome, ModuleError> {
        let locator = update.locator.as_ref().ok_or_else(|| ModuleError::VersionRetrieval {
            source_name: self.source.url.clone(),
            reason: "no download location was found".to_string(),
        })?;

        let directory = self.spec.directory_name();
        let module_dir = ctx.layout.module_dir(&directory);
        let scratch = &ctx.layout.scratch_dir;

        let artifact = fetch(ctx.http, locator, &self.spec.name, scratch, ctx.progress)?;
        normalize(&artifact, &module_dir, scratch)?;
        apply_overlay(&ctx.layout.addon_dir(&directory), &module_dir)?;
        run_post_install_hook(&module_dir)?;

        Ok(InstallOutcome {
            version: update.version.clone(),
            activation_paths: self.source.activation_paths.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::http_client::fake::FakeHttp;
    use crate::libs::paths::EnvironmentLayout;
    use crate::libs::process_runner::fake::ScriptedRunner;
    use crate::libs::utilities::compression::tests::write_zip;
    use crate::libs::utilities::progress::{ProgressSink, SilentProgress};
    use crate::schemas::modules_file::{ModuleCategory, ModuleEntry};
    use std::fs;

    fn silent(_: &str) -> Box<dyn ProgressSink> {
        Box::new(SilentProgress)
    }

    #[test]
    fn full_generic_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvironmentLayout::new(dir.path());

        // Build the artifact the fake vendor serves.
        let artifact = dir.path().join("artifact.zip");
        write_zip(&artifact, &[("Tool-2.1/", ""), ("Tool-2.1/bin/tool", "v2.1"), ("Tool-2.1/old.cfg", "vendor")]);
        let bytes = fs::read(&artifact).unwrap();

        fs::create_dir_all(layout.addon_dir("tool")).unwrap();
        fs::write(layout.addon_dir("tool").join("old.cfg"), "mine").unwrap();

        let http = FakeHttp::default()
            .page("https://tool.example/releases", "Tool-2.0.zip Tool-2.1.zip")
            .file("https://tool.example/releases/Tool-2.1.zip", &bytes);
        let runner = ScriptedRunner::default();
        let ctx = InstallContext {
            layout: &layout,
            http: &http,
            runner: &runner,
            progress: &silent,
        };

        let entry = ModuleEntry {
            name: "Tool".to_string(),
            enabled: true,
            version: "2.0".to_string(),
            url: Some("https://tool.example/releases".to_string()),
            pattern: Some(r"Tool-([0-9.]+)\.zip".to_string()),
            paths: vec!["bin".to_string()],
        };
        let spec = ModuleSpec::from_entry(ModuleCategory::Generic, &entry).unwrap();
        let crate::schemas::module_spec::ModuleKind::Generic(source) = spec.kind.clone() else {
            unreachable!()
        };
        let module = GenericModule::new(spec, source);

        let update = module.check_version(&ctx, &VersionToken::parse("2.0").unwrap()).unwrap().unwrap();
        let outcome = module.install(&ctx, &update).unwrap();

        assert_eq!(outcome.version.to_string(), "2.1");
        assert_eq!(outcome.activation_paths, vec!["bin".to_string()]);
        let module_dir = layout.module_dir("tool");
        assert_eq!(fs::read_to_string(module_dir.join("bin/tool")).unwrap(), "v2.1");
        assert_eq!(fs::read_to_string(module_dir.join("old.cfg")).unwrap(), "mine");
    }
}
