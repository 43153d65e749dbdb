// The state ledger: persists the installed version of each module back into
// `modules.json` right after the module installs successfully.
//
// The document is handled as an untyped `serde_json::Value` so every field the
// user added by hand (comments-as-keys, unknown settings, ordering of entries)
// survives the rewrite. Only the matching entry's `version` changes.

use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::schemas::errors::LedgerError;
use crate::schemas::modules_file::ModuleCategory;
use crate::schemas::version_token::VersionToken;
use crate::{log_debug, log_info, log_warn};

pub struct StateLedger {
    path: PathBuf,
}

impl StateLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateLedger { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets `version` on the entry named `identity` in the given category.
    ///
    /// Every other byte of meaning in the document (unknown fields, key order,
    /// other entries) is preserved. The rewrite is atomic.
    ///
    /// # Arguments
    /// * `category`: The section to look in, under its canonical or legacy key.
    /// * `identity`: The entry's `name`, compared exactly.
    /// * `version`: The version that was just installed.
    ///
    /// # Returns
    /// * `Ok(true)` once the document on disk holds the new version.
    /// * `Ok(false)` with the file untouched when no such entry exists:
    ///   the ledger records versions, it never adds modules.
    /// * `Err(LedgerError)` if the document cannot be read, parsed or written.
    pub fn record_version(
        &self,
        category: ModuleCategory,
        identity: &str,
        version: &VersionToken,
    ) -> Result<bool, LedgerError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| LedgerError::Read {
            path: self.path.clone(),
            source,
        })?;
        let mut document: Value = serde_json::from_str(&contents).map_err(|source| LedgerError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if !set_entry_version(&mut document, category, identity, &version.to_string()) {
            log_warn!(
                "[Ledger] No {} entry named '{}' in {}; version {} not recorded.",
                category,
                identity.yellow(),
                self.path.display(),
                version
            );
            return Ok(false);
        }

        self.write_atomically(&document)?;
        log_info!(
            "[Ledger] Recorded {} {} in {}",
            identity.bold(),
            version.to_string().green(),
            self.path.display()
        );
        Ok(true)
    }

    /// Writes the document to a sibling temp file, then swaps it in.
    fn write_atomically(&self, document: &Value) -> Result<(), LedgerError> {
        let write_error = |source: std::io::Error| LedgerError::Write {
            path: self.path.clone(),
            source,
        };
        let rendered = serde_json::to_string_pretty(document).map_err(|e| write_error(e.into()))?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
        temp.write_all(rendered.as_bytes()).map_err(write_error)?;
        temp.write_all(b"\n").map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(&self.path).map_err(|e| write_error(e.error))?;
        log_debug!("[Ledger] {} rewritten", self.path.display());
        Ok(())
    }
}

/// Finds the category array (canonical key first, then the legacy alias) and
/// updates the first entry whose `name` matches. Returns whether anything changed.
fn set_entry_version(document: &mut Value, category: ModuleCategory, identity: &str, version: &str) -> bool {
    let Some(object) = document.as_object_mut() else {
        return false;
    };
    let key = if object.contains_key(category.key()) {
        category.key()
    } else {
        category.legacy_key()
    };
    let Some(entries) = object.get_mut(key).and_then(Value::as_array_mut) else {
        return false;
    };
    match entries
        .iter_mut()
        .find(|entry| entry.get("name").and_then(Value::as_str) == Some(identity))
    {
        Some(entry) => match entry.as_object_mut() {
            Some(fields) => {
                fields.insert("version".to_string(), Value::String(version.to_string()));
                true
            }
            None => false,
        },
        None => false,
    }
}
