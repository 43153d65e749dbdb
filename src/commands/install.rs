// The `install` command: wires the real network, process and progress
// collaborators into the pipeline and runs it over every enabled module.

use colored::Colorize;

use crate::commands::initialized_context;
use crate::installers::build_module;
use crate::libs::http_client::UreqClient;
use crate::libs::module_installer::{InstallContext, Module, install_modules};
use crate::libs::paths::EnvironmentLayout;
use crate::libs::process_runner::SystemRunner;
use crate::libs::state_ledger::StateLedger;
use crate::libs::utilities::progress::{BarProgress, ProgressSink};
use crate::log_info;

fn bar(label: &str) -> Box<dyn ProgressSink> {
    Box::new(BarProgress::new(label))
}

pub fn run(layout: EnvironmentLayout) -> anyhow::Result<()> {
    let mut ctx = initialized_context(layout)?;
    if ctx.modules.is_empty() {
        log_info!("[Install] No enabled modules in {}", ctx.layout.modules_file.display().to_string().cyan());
    }

    let modules: Vec<Box<dyn Module>> = ctx.modules.iter().cloned().map(build_module).collect();
    let http = UreqClient::new();
    let runner = SystemRunner;
    let ledger = StateLedger::new(&ctx.layout.modules_file);
    let install_ctx = InstallContext {
        layout: &ctx.layout,
        http: &http,
        runner: &runner,
        progress: &bar,
    };

    // Per-module failures are already logged inside the batch.
    install_modules(&install_ctx, &mut ctx.state, &modules, &ledger);
    Ok(())
}
