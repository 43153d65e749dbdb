// The `fold` command: deactivates the environment by restoring the PATH
// captured at `unfold` time, byte for byte.

use anyhow::Context;
use colored::Colorize;

use crate::commands::initialized_context;
use crate::libs::kv_store::open_default_store;
use crate::libs::path_activation::PathActivationMachine;
use crate::libs::paths::EnvironmentLayout;
use crate::log_info;

pub fn run(layout: EnvironmentLayout) -> anyhow::Result<()> {
    let ctx = initialized_context(layout)?;
    let store = open_default_store().context("Cannot open the PATH restore point")?;
    let mut machine = PathActivationMachine::with_default_scopes(store);

    machine.deactivate().context("Fold failed")?;
    log_info!("[Fold] Environment {} is folded", ctx.layout.root.display().to_string().green());
    Ok(())
}
