// Archive detection and extraction for downloaded module artifacts.
//
// Formats are recognised by file name first and by magic bytes second, because
// many download hosts serve artifacts from URLs without a usable extension.
// Every "this is not an archive I can read" condition surfaces as
// `io::ErrorKind::InvalidData` so the normalizer can fall back to treating the
// artifact as an opaque binary.

use crate::log_debug;
use bzip2::read::BzDecoder;
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Archive formats the normalizer can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    /// Single gzip-compressed file.
    Gz,
    /// Single bzip2-compressed file.
    Bz2,
    /// Single xz-compressed file.
    Xz,
}

impl ArchiveFormat {
    /// Guesses the format from the file name alone.
    pub fn from_file_name(name: &str) -> Option<ArchiveFormat> {
        let name = name.to_ascii_lowercase();
        // Longest suffixes first: `.tar.gz` must not be mistaken for `.gz`.
        let format = if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveFormat::TarGz
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz") {
            ArchiveFormat::TarBz2
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            ArchiveFormat::TarXz
        } else if name.ends_with(".zip") {
            ArchiveFormat::Zip
        } else if name.ends_with(".tar") {
            ArchiveFormat::Tar
        } else if name.ends_with(".gz") {
            ArchiveFormat::Gz
        } else if name.ends_with(".bz2") {
            ArchiveFormat::Bz2
        } else if name.ends_with(".xz") {
            ArchiveFormat::Xz
        } else {
            return None;
        };
        Some(format)
    }

    /// Guesses the format from the first bytes of the file.
    ///
    /// Compressed streams are reported as tarballs: a compressed single file
    /// without a recognisable name is far rarer than an extension-less tarball,
    /// and a wrong guess still ends up as `InvalidData`.
    pub fn from_magic(header: &[u8]) -> Option<ArchiveFormat> {
        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(ArchiveFormat::Zip)
        } else if header.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveFormat::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(ArchiveFormat::TarBz2)
        } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(ArchiveFormat::TarXz)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }
}

/// Detects the archive format of `path`, by name and then by content.
pub fn detect_format(path: &Path) -> io::Result<Option<ArchiveFormat>> {
    if let Some(format) = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(ArchiveFormat::from_file_name)
    {
        return Ok(Some(format));
    }

    let mut header = Vec::with_capacity(512);
    File::open(path)?.take(512).read_to_end(&mut header)?;
    Ok(ArchiveFormat::from_magic(&header))
}

/// Anything a decoder reports about the *content* of the stream means the
/// artifact is not a readable archive.
fn as_invalid_data(e: io::Error) -> io::Error {
    match e.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof | io::ErrorKind::Other => {
            io::Error::new(io::ErrorKind::InvalidData, e)
        }
        _ => e,
    }
}

fn zip_error(e: zip::result::ZipError) -> io::Error {
    match e {
        zip::result::ZipError::Io(e) => as_invalid_data(e),
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<()> {
    Archive::new(reader).unpack(dest).map_err(as_invalid_data)
}

/// Decompresses a single-file stream into `dest/<file stem>`.
fn decompress_single<R: Read>(mut reader: R, src: &Path, dest: &Path) -> io::Result<()> {
    let stem = src
        .file_stem()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "archive path has no file name"))?;
    let output_path = dest.join(stem);
    let mut output = File::create(&output_path)?;
    io::copy(&mut reader, &mut output).map_err(as_invalid_data)?;
    Ok(())
}

/// Extracts `src` into `dest`, creating `dest` if needed.
///
/// # Arguments
/// * `src`: The artifact; its name is tried first, then its first bytes.
/// * `dest`: Directory that receives the archive's top level.
///
/// # Returns
/// * `Ok(ArchiveFormat)` that was extracted.
/// * `Err` of kind `InvalidData` when the file is not a supported or readable
///   archive; any other kind is a genuine filesystem failure.
pub fn extract_archive(src: &Path, dest: &Path) -> io::Result<ArchiveFormat> {
    let format = detect_format(src)?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not a recognised archive", src.display()),
        )
    })?;
    log_debug!(
        "[Unpack] Extracting {} as {:?} into {}",
        src.display().to_string().blue(),
        format,
        dest.display().to_string().cyan()
    );

    fs::create_dir_all(dest)?;
    let file = File::open(src)?;
    match format {
        ArchiveFormat::Zip => {
            let mut archive = ZipArchive::new(file).map_err(zip_error)?;
            archive.extract(dest).map_err(zip_error)?;
        }
        ArchiveFormat::Tar => unpack_tar(file, dest)?,
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(file), dest)?,
        ArchiveFormat::TarBz2 => unpack_tar(BzDecoder::new(file), dest)?,
        ArchiveFormat::TarXz => unpack_tar(XzDecoder::new(file), dest)?,
        ArchiveFormat::Gz => decompress_single(GzDecoder::new(file), src, dest)?,
        ArchiveFormat::Bz2 => decompress_single(BzDecoder::new(file), src, dest)?,
        ArchiveFormat::Xz => decompress_single(XzDecoder::new(file), src, dest)?,
    }
    log_debug!("[Unpack] {:?} archive extracted", format);
    Ok(format)
}
