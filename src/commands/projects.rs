// The `projects` command: opens the configured projects directory in the
// platform's file manager and returns immediately.

use anyhow::{Context, bail};
use colored::Colorize;

use crate::commands::initialized_context;
use crate::libs::paths::EnvironmentLayout;
use crate::libs::utilities::platform::file_manager_command;
use crate::log_info;

pub fn run(layout: EnvironmentLayout) -> anyhow::Result<()> {
    let ctx = initialized_context(layout)?;
    let dir = &ctx.projects_dir;
    if !dir.is_dir() {
        bail!(
            "Projects directory {} does not exist (projectsDirectory = \"{}\")",
            dir.display(),
            ctx.config.projects_directory
        );
    }

    file_manager_command(dir)
        .spawn()
        .with_context(|| format!("Failed to open {}", dir.display()))?;
    log_info!("[Projects] Opened {}", dir.display().to_string().cyan());
    Ok(())
}
