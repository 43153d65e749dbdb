// Filesystem helpers shared by the normalizer, the overlay and the fetcher.

use crate::log_debug;
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Removes a file or directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Copies every file under `src` into `dst`, creating directories as needed
/// and overwriting files that already exist. Nothing in `dst` is ever deleted.
///
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    let mut copied = 0;
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Moves a file or directory, falling back to copy-then-delete when a plain
/// rename is not possible (e.g. across devices).
pub fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log_debug!(
                "[Files] rename {} -> {} failed ({}), copying instead",
                src.display(),
                dst.display().to_string().cyan(),
                rename_err
            );
            if src.is_dir() {
                copy_tree(src, dst)?;
                fs::remove_dir_all(src)
            } else {
                fs::copy(src, dst)?;
                fs::remove_file(src)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_tree_overwrites_but_never_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("addons");
        let dst = dir.path().join("module");
        fs::create_dir_all(src.join("conf")).unwrap();
        fs::write(src.join("conf/settings.ini"), "from addon").unwrap();
        fs::create_dir_all(dst.join("conf")).unwrap();
        fs::write(dst.join("conf/settings.ini"), "original").unwrap();
        fs::write(dst.join("keep.txt"), "untouched").unwrap();

        assert_eq!(copy_tree(&src, &dst).unwrap(), 1);
        assert_eq!(fs::read_to_string(dst.join("conf/settings.ini")).unwrap(), "from addon");
        assert_eq!(fs::read_to_string(dst.join("keep.txt")).unwrap(), "untouched");
    }

    #[test]
    fn move_path_moves_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/f"), "x").unwrap();
        let dst = dir.path().join("deeper/b");

        move_path(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("nested/f")).unwrap(), "x");
    }

    #[test]
    fn removing_a_missing_path_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        remove_path(&dir.path().join("nope")).unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "").unwrap();
        remove_path(&file).unwrap();
        assert!(!file.exists());
    }
}
