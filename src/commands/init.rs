// src/commands/init.rs
// Lays down a fresh environment: the directory tree, the two JSON documents
// and one launcher script per everyday command, all inside the root.
// Nothing outside the root is touched.

use anyhow::{Context, bail};
use colored::Colorize;
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::libs::paths::EnvironmentLayout;
use crate::schemas::environment_config::EnvironmentConfig;
use crate::schemas::version_token::NEVER_INSTALLED;
use crate::{log_debug, log_info};

/// Commands that get a launcher in `shortcuts/`.
const SHORTCUT_COMMANDS: [&str; 4] = ["fold", "unfold", "install", "projects"];

/// Starter `modules.json`: one disabled example per section to copy from.
fn default_modules_document() -> serde_json::Value {
    let (pattern, paths) = if cfg!(windows) {
        (r"node-v([0-9.]+)-win-x64\.zip", json!(["."]))
    } else {
        (r"node-v([0-9.]+)-linux-x64\.tar\.gz", json!(["bin"]))
    };
    json!({
        "generic": [
            {
                "name": "NodeJS",
                "enabled": false,
                "version": NEVER_INSTALLED,
                "url": "https://nodejs.org/dist/latest/",
                "pattern": pattern,
                "paths": paths
            }
        ],
        "registry-npm": [
            { "name": "typescript", "enabled": false, "version": NEVER_INSTALLED }
        ],
        "registry-composer": [
            { "name": "laravel/installer", "enabled": false, "version": NEVER_INSTALLED }
        ]
    })
}

/// Launcher script body that re-enters this executable with a fixed root.
fn shortcut_script(exe: &Path, root: &Path, command: &str) -> String {
    if cfg!(windows) {
        format!(
            "@echo off\r\n\"{}\" --root \"{}\" {} %*\r\n",
            exe.display(),
            root.display(),
            command
        )
    } else {
        format!(
            "#!/bin/sh\nexec \"{}\" --root \"{}\" {} \"$@\"\n",
            exe.display(),
            root.display(),
            command
        )
    }
}

fn write_shortcuts(layout: &EnvironmentLayout) -> anyhow::Result<()> {
    let exe = std::env::current_exe().context("Cannot locate the running executable for shortcuts")?;
    let extension = if cfg!(windows) { "bat" } else { "sh" };
    for command in SHORTCUT_COMMANDS {
        let path = layout.shortcuts_dir.join(format!("{command}.{extension}"));
        fs::write(&path, shortcut_script(&exe, &layout.root, command))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Failed to make {} executable", path.display()))?;
        }
        log_debug!("[Init] Wrote {}", path.display());
    }
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    fs::write(path, rendered + "\n").with_context(|| format!("Failed to write {}", path.display()))?;
    log_info!("[Init] Created {}", path.display().to_string().cyan());
    Ok(())
}

pub fn run(layout: &EnvironmentLayout) -> anyhow::Result<()> {
    if layout.config_file.exists() {
        bail!(
            "{} already exists; this environment is already initialized",
            layout.config_file.display()
        );
    }

    let config = EnvironmentConfig::default();
    for dir in [
        &layout.programs_dir,
        &layout.addons_dir,
        &layout.shortcuts_dir,
        &layout.root.join(&config.projects_directory),
    ] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        log_debug!("[Init] Directory {}", dir.display());
    }

    write_json(&layout.config_file, &config)?;
    // An existing modules.json (e.g. copied from another machine) is kept as-is.
    if layout.modules_file.exists() {
        log_info!("[Init] Keeping existing {}", layout.modules_file.display());
    } else {
        write_json(&layout.modules_file, &default_modules_document())?;
    }
    write_shortcuts(layout)?;

    log_info!(
        "[Init] Environment ready at {}. Edit {} and run {}.",
        layout.root.display().to_string().green(),
        "modules.json".cyan(),
        "envfold install".bold()
    );
    Ok(())
}
