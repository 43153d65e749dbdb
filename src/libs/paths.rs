// Resolves the environment root and every path derived from it.
//
// The environment is a self-contained directory tree:
//
//   <root>/config.json          environment settings
//   <root>/modules.json         module configuration + version ledger
//   <root>/programs/<module>/   installed modules (lower-cased names)
//   <root>/addons/<module>/     user-maintained overlay copied over a fresh install
//   <root>/temp/                scratch area, exclusive to one install at a time
//   <root>/projects/            default projects directory
//   <root>/shortcuts/           fold/unfold/install/projects launchers written by `init`

use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

use crate::{log_debug, log_warn};

pub const CONFIG_FILE: &str = "config.json";
pub const MODULES_FILE: &str = "modules.json";

/// Every location the pipeline touches, derived once from the root.
#[derive(Debug, Clone)]
pub struct EnvironmentLayout {
    pub root: PathBuf,
    pub programs_dir: PathBuf,
    pub addons_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub shortcuts_dir: PathBuf,
    pub config_file: PathBuf,
    pub modules_file: PathBuf,
}

impl EnvironmentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        EnvironmentLayout {
            programs_dir: root.join("programs"),
            addons_dir: root.join("addons"),
            scratch_dir: root.join("temp"),
            shortcuts_dir: root.join("shortcuts"),
            config_file: root.join(CONFIG_FILE),
            modules_file: root.join(MODULES_FILE),
            root,
        }
    }

    /// Where a module with the given directory name is installed.
    pub fn module_dir(&self, directory_name: &str) -> PathBuf {
        self.programs_dir.join(directory_name)
    }

    /// Where the user keeps files that are overlaid onto a fresh install.
    pub fn addon_dir(&self, directory_name: &str) -> PathBuf {
        self.addons_dir.join(directory_name)
    }

    /// `init` has run: both documents exist.
    pub fn is_initialized(&self) -> bool {
        self.config_file.is_file() && self.modules_file.is_file()
    }
}

/// Picks the environment root: an explicit `--root`/`ENVFOLD_ROOT` value wins,
/// otherwise the directory holding the running executable.
pub fn resolve_root(explicit: Option<PathBuf>) -> PathBuf {
    let root = match explicit {
        Some(root) => root,
        None => match env::current_exe() {
            Ok(exe) => exe
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(e) => {
                log_warn!(
                    "[Paths] Cannot locate the running executable ({}). Using the current directory as environment root.",
                    e
                );
                PathBuf::from(".")
            }
        },
    };

    // Absolute paths end up in PATH, so normalize once here.
    let root = if root.is_absolute() {
        root
    } else {
        env::current_dir().map(|cwd| cwd.join(&root)).unwrap_or(root)
    };
    log_debug!("[Paths] Environment root: {}", root.display().to_string().cyan());
    root
}

/// Some tools break on paths with spaces or non-ASCII characters; warn early.
pub fn has_portable_characters(path: &Path) -> bool {
    regex::Regex::new(r"^[0-9A-Za-z._/\\:'\-]+$")
        .map(|pattern| pattern.is_match(&path.to_string_lossy()))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_derives_every_location_from_the_root() {
        let layout = EnvironmentLayout::new("/opt/env");
        assert_eq!(layout.module_dir("nodejs"), PathBuf::from("/opt/env/programs/nodejs"));
        assert_eq!(layout.addon_dir("git"), PathBuf::from("/opt/env/addons/git"));
        assert_eq!(layout.scratch_dir, PathBuf::from("/opt/env/temp"));
        assert_eq!(layout.modules_file, PathBuf::from("/opt/env/modules.json"));
    }

    #[test]
    fn uninitialized_until_both_documents_exist() {
        let dir = tempfile::tempdir().unwrap();
        let layout = EnvironmentLayout::new(dir.path());
        assert!(!layout.is_initialized());
        std::fs::write(&layout.config_file, "{}").unwrap();
        assert!(!layout.is_initialized());
        std::fs::write(&layout.modules_file, "{}").unwrap();
        assert!(layout.is_initialized());
    }

    #[test]
    fn flags_paths_with_spaces() {
        assert!(has_portable_characters(Path::new("/opt/dev-env/programs")));
        assert!(has_portable_characters(Path::new(r"C:\Dev\env")));
        assert!(!has_portable_characters(Path::new("/home/me/My Tools")));
    }

    #[test]
    fn explicit_relative_root_becomes_absolute() {
        let root = resolve_root(Some(PathBuf::from("relative-env")));
        assert!(root.is_absolute());
        assert!(root.ends_with("relative-env"));
    }
}
