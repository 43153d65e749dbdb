//! # Archive Normalizer
//!
//! Turns a downloaded artifact into exactly one module directory.
//!
//! Vendors package the same tool in wildly different shapes: a zip with a
//! single versioned wrapper folder, a tarball with files at the top level, or
//! a bare installer/executable. After normalization the module directory
//! always holds the tool's contents directly:
//!
//! - one top-level directory and no files → that directory *is* the module,
//! - any other top level → the whole unpacked tree is the module (a single
//!   unpacked file, e.g. from `tool.phar.gz`, lands in the module as itself),
//! - not an archive at all → the module directory holds the raw file.

use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

use crate::libs::utilities::compression::extract_archive;
use crate::libs::utilities::file_operations::{move_path, remove_path};
use crate::schemas::errors::ModuleError;
use crate::{log_debug, log_info, log_warn};

/// Which shape the artifact had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized {
    /// A single wrapper directory was stripped.
    WrapperStripped,
    /// The unpacked tree was used as-is.
    WholeTree,
    /// The artifact was not an archive and was kept as a file.
    Opaque,
}

/// Replaces `module_dir` with the normalized contents of `archive`.
///
/// The previous install is removed first, so nothing from an older version
/// survives. The scratch `unpacked` area and the archive itself are gone
/// afterwards, whether normalization succeeded or not.
///
/// # Arguments
/// * `archive`: The downloaded artifact, somewhere under `scratch_dir`.
/// * `module_dir`: `programs/<module>`; replaced wholesale.
/// * `scratch_dir`: The batch's scratch area; `unpacked/` is created inside it.
///
/// # Returns
/// * `Ok(Normalized)` telling which shape the artifact had.
/// * `Err(ModuleError::Io)` if the filesystem refused a step. A file that is
///   not a readable archive is never an error; it takes the opaque path.
pub fn normalize(archive: &Path, module_dir: &Path, scratch_dir: &Path) -> Result<Normalized, ModuleError> {
    let unpacked = scratch_dir.join("unpacked");
    let result = normalize_into(archive, module_dir, &unpacked);

    if let Err(e) = remove_path(&unpacked) {
        log_warn!("[Unpack] Could not clean {}: {}", unpacked.display(), e);
    }
    if let Err(e) = remove_path(archive) {
        log_warn!("[Unpack] Could not remove {}: {}", archive.display(), e);
    }
    result
}

fn normalize_into(archive: &Path, module_dir: &Path, unpacked: &Path) -> Result<Normalized, ModuleError> {
    remove_path(module_dir).map_err(ModuleError::io("cannot replace", module_dir))?;
    remove_path(unpacked).map_err(ModuleError::io("cannot clean", unpacked))?;

    match extract_archive(archive, unpacked) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            log_debug!("[Unpack] {} is not an archive ({}), keeping it as a file", archive.display(), e);
            return keep_opaque(archive, module_dir);
        }
        Err(e) => return Err(ModuleError::io("cannot extract", archive)(e)),
    }

    let (dirs, files) = top_level(unpacked).map_err(ModuleError::io("cannot list", unpacked))?;
    if let ([wrapper], []) = (dirs.as_slice(), files.as_slice()) {
        move_path(wrapper, module_dir).map_err(ModuleError::io("cannot move", wrapper))?;
        log_info!(
            "[Unpack] Installed into {} (stripped wrapper directory)",
            module_dir.display().to_string().cyan()
        );
        return Ok(Normalized::WrapperStripped);
    }

    move_path(unpacked, module_dir).map_err(ModuleError::io("cannot move", unpacked))?;
    log_info!("[Unpack] Installed into {}", module_dir.display().to_string().cyan());
    Ok(Normalized::WholeTree)
}

fn keep_opaque(archive: &Path, module_dir: &Path) -> Result<Normalized, ModuleError> {
    fs::create_dir_all(module_dir).map_err(ModuleError::io("cannot create", module_dir))?;
    let file_name = archive.file_name().unwrap_or_default();
    let target = module_dir.join(file_name);
    move_path(archive, &target).map_err(ModuleError::io("cannot move", archive))?;
    log_info!("[Unpack] Installed file {}", target.display().to_string().cyan());
    Ok(Normalized::Opaque)
}

/// Top-level directories and files of `dir`.
fn top_level(dir: &Path) -> io::Result<(Vec<std::path::PathBuf>, Vec<std::path::PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    Ok((dirs, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::utilities::compression::tests::{write_tar_gz, write_zip};

    struct Fixture {
        _dir: tempfile::TempDir,
        scratch: std::path::PathBuf,
        module: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("temp");
        fs::create_dir_all(&scratch).unwrap();
        let module = dir.path().join("programs/tool");
        Fixture {
            scratch,
            module,
            _dir: dir,
        }
    }

    #[test]
    fn single_wrapper_directory_is_stripped() {
        let f = fixture();
        let archive = f.scratch.join("tool-1.2.zip");
        write_zip(&archive, &[("tool-1.2/", ""), ("tool-1.2/bin/tool.exe", "exe"), ("tool-1.2/README", "r")]);

        assert_eq!(normalize(&archive, &f.module, &f.scratch).unwrap(), Normalized::WrapperStripped);
        assert_eq!(fs::read_to_string(f.module.join("bin/tool.exe")).unwrap(), "exe");
        assert!(f.module.join("README").is_file());
        assert!(!f.module.join("tool-1.2").exists());
        assert!(!archive.exists());
        assert!(!f.scratch.join("unpacked").exists());
    }

    #[test]
    fn mixed_top_level_keeps_the_whole_tree() {
        let f = fixture();
        let archive = f.scratch.join("tool.tar.gz");
        write_tar_gz(&archive, &[("bin/tool", "t"), ("LICENSE", "l")]);

        assert_eq!(normalize(&archive, &f.module, &f.scratch).unwrap(), Normalized::WholeTree);
        assert!(f.module.join("bin/tool").is_file());
        assert!(f.module.join("LICENSE").is_file());
    }

    #[test]
    fn non_archives_are_kept_under_their_own_name() {
        let f = fixture();
        let artifact = f.scratch.join("installer.exe");
        fs::write(&artifact, b"MZ binary").unwrap();

        assert_eq!(normalize(&artifact, &f.module, &f.scratch).unwrap(), Normalized::Opaque);
        assert_eq!(fs::read(f.module.join("installer.exe")).unwrap(), b"MZ binary");
        assert!(!artifact.exists());
    }

    #[test]
    fn corrupt_archive_falls_back_to_opaque() {
        let f = fixture();
        let artifact = f.scratch.join("broken.zip");
        fs::write(&artifact, b"not really a zip").unwrap();

        assert_eq!(normalize(&artifact, &f.module, &f.scratch).unwrap(), Normalized::Opaque);
        assert!(f.module.join("broken.zip").is_file());
    }

    #[test]
    fn single_file_archive_installs_the_unpacked_file() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let f = fixture();
        let archive = f.scratch.join("composer.phar.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(b"<?php").unwrap();
        encoder.finish().unwrap();

        assert_eq!(normalize(&archive, &f.module, &f.scratch).unwrap(), Normalized::WholeTree);
        assert_eq!(fs::read_to_string(f.module.join("composer.phar")).unwrap(), "<?php");
        assert!(!f.module.join("composer.phar.gz").exists());
    }

    #[test]
    fn previous_install_is_replaced() {
        let f = fixture();
        fs::create_dir_all(&f.module).unwrap();
        fs::write(f.module.join("stale.dll"), "old").unwrap();
        let archive = f.scratch.join("tool.zip");
        write_zip(&archive, &[("fresh.dll", "new")]);

        normalize(&archive, &f.module, &f.scratch).unwrap();
        assert!(!f.module.join("stale.dll").exists());
        assert!(f.module.join("fresh.dll").is_file());
    }
}
