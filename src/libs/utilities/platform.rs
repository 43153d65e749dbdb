// Platform-specific details: PATH separator, executable names, the hook
// script and the directory opener.

use crate::log_debug;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Separator between PATH entries.
pub const PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Name of the one-shot post-install script looked up at a module's root.
pub const HOOK_SCRIPT: &str = if cfg!(windows) { "env-run.bat" } else { "env-run.sh" };

/// Builds the command that runs a hook script.
pub fn hook_command(script: &Path) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(script);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg(script);
        command
    }
}

/// File names a package-manager launcher can have inside a module directory.
pub fn launcher_names(tool: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{tool}.cmd"), format!("{tool}.bat"), format!("{tool}.exe")]
    } else {
        // Unix Node.js tarballs keep their launchers under `bin/`.
        vec![tool.to_string(), format!("bin/{tool}")]
    }
}

/// Looks for `tool` inside `module_dir` first, then on PATH.
pub fn locate_tool(tool: &str, module_dir: &Path) -> Option<PathBuf> {
    let bundled = launcher_names(tool)
        .into_iter()
        .map(|name| module_dir.join(name))
        .find(|candidate| candidate.is_file());
    if let Some(path) = bundled {
        log_debug!("[Platform] Using bundled {} at {}", tool, path.display().to_string().cyan());
        return Some(path);
    }
    let found = which::which(tool).ok();
    if let Some(path) = &found {
        log_debug!("[Platform] Using {} from PATH at {}", tool, path.display().to_string().cyan());
    }
    found
}

/// The command that opens a directory in the desktop file manager.
pub fn file_manager_command(dir: &Path) -> Command {
    let program = if cfg!(windows) {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let mut command = Command::new(program);
    command.arg(dir);
    command
}
