// The `unfold` command: activates the environment by putting every installed
// module's activation paths, and the root itself, on PATH.

use anyhow::Context;
use colored::Colorize;

use crate::commands::initialized_context;
use crate::libs::kv_store::open_default_store;
use crate::libs::path_activation::PathActivationMachine;
use crate::libs::paths::EnvironmentLayout;
use crate::{log_debug, log_info};

pub fn run(layout: EnvironmentLayout) -> anyhow::Result<()> {
    let ctx = initialized_context(layout)?;
    let store = open_default_store().context("Cannot open the PATH restore point")?;
    let mut machine = PathActivationMachine::with_default_scopes(store);

    let snapshot = machine
        .activate(&ctx.activation_candidates(), &ctx.layout.root)
        .context("Unfold failed")?;
    log_debug!("[Unfold] PATH is now {}", snapshot.active);

    log_info!("[Unfold] Environment {} is unfolded", ctx.layout.root.display().to_string().green());
    if cfg!(not(windows)) {
        log_info!(
            "[Unfold] New shells pick it up by sourcing {}",
            crate::libs::kv_store::state_dir().join("env.sh").display().to_string().cyan()
        );
    }
    Ok(())
}
