// Register application subcommands.
// Each module corresponds to a specific `envfold` command-line action.

// Restores PATH captured by `unfold`.
pub mod fold;
// Lists the commands.
pub mod help;
// Lays down a fresh environment.
pub mod init;
// Runs the update-and-install pipeline.
pub mod install;
// Opens the projects directory.
pub mod projects;
// Puts installed tools on PATH.
pub mod unfold;

use anyhow::{Context, bail};
use colored::Colorize;

use crate::libs::config_loading::load_context;
use crate::libs::context::EnvironmentContext;
use crate::libs::paths::EnvironmentLayout;

/// Loads the run context, refusing roots that `init` has not prepared.
pub(crate) fn initialized_context(layout: EnvironmentLayout) -> anyhow::Result<EnvironmentContext> {
    if !layout.is_initialized() {
        bail!(
            "Environment at {} is not initialized. Run `{}` first.",
            layout.root.display(),
            "envfold init".bold()
        );
    }
    let root = layout.root.clone();
    load_context(layout).with_context(|| format!("Failed to load the environment at {}", root.display()))
}
