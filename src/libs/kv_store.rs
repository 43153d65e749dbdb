// Durable key-value storage for the PATH restore point.
//
// The activation machine only needs get/set/delete on string keys. On Windows
// the values live next to the user's environment in the registry; everywhere
// else they live in a small JSON file under the user config directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::log_debug;
use crate::schemas::errors::StoreError;
use colored::Colorize;

/// Key holding the PATH value captured right before `unfold`.
pub const ORIGINAL_PATH_KEY: &str = "original_path";

/// Directory holding the file store and the shell profile snippet.
/// `ENVFOLD_STATE_DIR` overrides the default `<config dir>/envfold`.
pub fn state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("ENVFOLD_STATE_DIR").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("envfold")
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

/// JSON object on disk, rewritten on every mutation.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// The store at `<state dir>/state.json`.
    pub fn in_state_dir() -> Self {
        FileStore::new(state_dir().join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_error)?;
        let rendered = serde_json::to_string_pretty(values).map_err(|e| io_error(e.into()))?;

        // A torn write would lose the restore point; swap a complete file in instead.
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        temp.write_all(rendered.as_bytes()).map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&self.path).map_err(|e| io_error(e.error))?;
        log_debug!("[Store] Saved {}", self.path.display().to_string().cyan());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

/// String values under `HKCU\Software\envfold`.
#[cfg(windows)]
pub struct RegistryStore {
    key: winreg::RegKey,
}

#[cfg(windows)]
impl RegistryStore {
    pub fn open() -> Result<Self, StoreError> {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;
        let (key, _) = RegKey::predef(HKEY_CURRENT_USER)
            .create_subkey("Software\\envfold")
            .map_err(StoreError::Registry)?;
        Ok(RegistryStore { key })
    }
}

#[cfg(windows)]
impl KeyValueStore for RegistryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.key.get_value::<String, _>(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Registry(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.key.set_value(key, &value.to_string()).map_err(StoreError::Registry)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        match self.key.delete_value(key) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(StoreError::Registry(e)),
            _ => Ok(()),
        }
    }
}

/// The platform's durable store for the restore point.
pub fn open_default_store() -> Result<Box<dyn KeyValueStore>, StoreError> {
    #[cfg(windows)]
    {
        Ok(Box::new(RegistryStore::open()?))
    }
    #[cfg(not(windows))]
    {
        Ok(Box::new(FileStore::in_state_dir()))
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    pub values: BTreeMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}
