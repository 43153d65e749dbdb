//! # PATH Activation
//!
//! `unfold` puts the environment's tools on PATH, `fold` takes them off again.
//!
//! The machine has exactly two states, and the key-value store is the single
//! source of truth for which one is current:
//!
//! - **folded**: no `original_path` in the store,
//! - **unfolded**: `original_path` holds PATH exactly as it was before unfolding.
//!
//! Unfolding captures PATH, appends every existing activation path plus the
//! environment root, and writes the result to every scope. Folding writes the
//! captured value back verbatim and forgets it. Both refuse to run from the
//! wrong state without touching anything.

use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::libs::kv_store::{KeyValueStore, ORIGINAL_PATH_KEY};
use crate::libs::utilities::platform::PATH_SEPARATOR;
use crate::schemas::errors::ActivationError;
use crate::{log_debug, log_info};

/// One place a PATH value lives (the running process, the user's profile...).
pub trait PathScope {
    fn name(&self) -> &'static str;
    /// Current value, `None` if this scope has none.
    fn read(&self) -> Result<Option<String>, ActivationError>;
    fn write(&mut self, value: &str) -> Result<(), ActivationError>;
}

/// The PATH of this process and of anything it spawns.
pub struct ProcessScope;

impl PathScope for ProcessScope {
    fn name(&self) -> &'static str {
        "process"
    }

    fn read(&self) -> Result<Option<String>, ActivationError> {
        Ok(std::env::var_os("PATH").map(|v| v.to_string_lossy().into_owned()))
    }

    fn write(&mut self, value: &str) -> Result<(), ActivationError> {
        // SAFETY: the CLI is single-threaded while fold/unfold run; no other
        // thread reads or writes the environment concurrently.
        unsafe { std::env::set_var("PATH", value) };
        Ok(())
    }
}

/// The durable per-user PATH, picked up by new shells.
///
/// Windows: the `path` value of `HKCU\Environment`.
#[cfg(windows)]
pub struct UserScope;

#[cfg(windows)]
impl UserScope {
    pub fn open() -> Self {
        UserScope
    }

    fn environment_key(write: bool) -> Result<winreg::RegKey, ActivationError> {
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_WRITE};
        let access = if write { KEY_READ | KEY_WRITE } else { KEY_READ };
        RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey_with_flags("Environment", access)
            .map_err(|e| ActivationError::Scope {
                scope: "user",
                reason: e.to_string(),
            })
    }
}

#[cfg(windows)]
impl PathScope for UserScope {
    fn name(&self) -> &'static str {
        "user"
    }

    fn read(&self) -> Result<Option<String>, ActivationError> {
        match Self::environment_key(false)?.get_value::<String, _>("path") {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ActivationError::Scope {
                scope: "user",
                reason: e.to_string(),
            }),
        }
    }

    fn write(&mut self, value: &str) -> Result<(), ActivationError> {
        Self::environment_key(true)?
            .set_value("path", &value.to_string())
            .map_err(|e| ActivationError::Scope {
                scope: "user",
                reason: e.to_string(),
            })
    }
}

/// The durable per-user PATH, picked up by new shells.
///
/// Elsewhere: the `path` key of the file store, mirrored into an `env.sh`
/// snippet next to it that shell profiles can source. Both are outputs only:
/// the live PATH of a Unix login is owned by the shell, so this scope never
/// reports a value and the process PATH is what gets captured.
#[cfg(not(windows))]
pub struct UserScope {
    store: crate::libs::kv_store::FileStore,
    snippet: PathBuf,
}

#[cfg(not(windows))]
impl UserScope {
    pub fn open() -> Self {
        UserScope::in_dir(&crate::libs::kv_store::state_dir())
    }

    /// The scope backed by `user-path.json` and `env.sh` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        UserScope {
            store: crate::libs::kv_store::FileStore::new(dir.join("user-path.json")),
            snippet: dir.join("env.sh"),
        }
    }
}

#[cfg(not(windows))]
impl PathScope for UserScope {
    fn name(&self) -> &'static str {
        "user"
    }

    fn read(&self) -> Result<Option<String>, ActivationError> {
        // The mirror holds whatever envfold wrote last, not the PATH in effect.
        Ok(None)
    }

    fn write(&mut self, value: &str) -> Result<(), ActivationError> {
        self.store.set("path", value)?;
        std::fs::write(&self.snippet, shell_export_line(value)).map_err(|e| ActivationError::Scope {
            scope: "user",
            reason: format!("{}: {}", self.snippet.display(), e),
        })?;
        log_debug!("[Unfold] Wrote {}", self.snippet.display().to_string().cyan());
        Ok(())
    }
}

/// `export PATH="..."` with the value escaped for a double-quoted POSIX string.
#[cfg_attr(windows, allow(dead_code))]
fn shell_export_line(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("export PATH=\"{escaped}\"\n")
}

/// PATH before and after unfolding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSnapshot {
    pub original: String,
    pub active: String,
}

/// `original` + activation paths + root, joined with the platform separator.
pub fn compose_active_path(original: &str, activation_paths: &[PathBuf], root: &Path) -> String {
    let trimmed = original.trim_end_matches(PATH_SEPARATOR);
    let mut entries: Vec<String> = Vec::with_capacity(activation_paths.len() + 2);
    if !trimmed.is_empty() {
        entries.push(trimmed.to_string());
    }
    entries.extend(activation_paths.iter().map(|p| p.display().to_string()));
    entries.push(root.display().to_string());
    entries.join(&PATH_SEPARATOR.to_string())
}

pub struct PathActivationMachine {
    store: Box<dyn KeyValueStore>,
    /// Read in order (first value wins); all are written.
    scopes: Vec<Box<dyn PathScope>>,
}

impl PathActivationMachine {
    pub fn new(store: Box<dyn KeyValueStore>, scopes: Vec<Box<dyn PathScope>>) -> Self {
        PathActivationMachine { store, scopes }
    }

    /// The user scope first, then this process. Off Windows the user scope
    /// never reports a value, so the current PATH comes from this process.
    pub fn with_default_scopes(store: Box<dyn KeyValueStore>) -> Self {
        PathActivationMachine::new(store, vec![Box::new(UserScope::open()), Box::new(ProcessScope)])
    }

    pub fn is_unfolded(&self) -> Result<bool, ActivationError> {
        Ok(self.store.get(ORIGINAL_PATH_KEY)?.is_some())
    }

    fn current_path(&self) -> Result<String, ActivationError> {
        for scope in &self.scopes {
            if let Some(value) = scope.read()? {
                log_debug!("[Unfold] Current PATH taken from the {} scope", scope.name());
                return Ok(value);
            }
        }
        Ok(String::new())
    }

    fn write_all(&mut self, value: &str) -> Result<(), ActivationError> {
        for scope in self.scopes.iter_mut() {
            scope.write(value)?;
            log_debug!("[Unfold] PATH updated in the {} scope", scope.name());
        }
        Ok(())
    }

    /// Unfolds: captures PATH and extends it with the candidates that exist on disk.
    ///
    /// # Arguments
    /// * `candidates`: Absolute activation paths in configuration order;
    ///   missing ones are skipped.
    /// * `root`: The environment root, always appended last.
    ///
    /// # Returns
    /// * `Ok(PathSnapshot)` with the captured and the newly written PATH.
    /// * `Err(ActivationError::AlreadyUnfolded)` without touching anything when
    ///   a restore point exists.
    /// * `Err(ActivationError::Store | Scope)` if persisting or writing failed.
    pub fn activate(&mut self, candidates: &[PathBuf], root: &Path) -> Result<PathSnapshot, ActivationError> {
        if self.is_unfolded()? {
            return Err(ActivationError::AlreadyUnfolded);
        }

        let original = self.current_path()?;
        self.store.set(ORIGINAL_PATH_KEY, &original)?;

        let existing: Vec<PathBuf> = candidates
            .iter()
            .map(|candidate| candidate.components().collect::<PathBuf>())
            .filter(|candidate| {
                let exists = candidate.exists();
                if !exists {
                    log_debug!("[Unfold] Skipping missing activation path {}", candidate.display());
                }
                exists
            })
            .collect();

        let active = compose_active_path(&original, &existing, root);
        self.write_all(&active)?;
        log_info!(
            "[Unfold] {} path(s) added to PATH, plus {}",
            existing.len().to_string().bold(),
            root.display().to_string().cyan()
        );
        Ok(PathSnapshot { original, active })
    }

    /// Folds: restores the captured PATH exactly and forgets it.
    ///
    /// # Returns
    /// * `Ok(String)` holding the restored PATH.
    /// * `Err(ActivationError::NotUnfolded)` without touching PATH when there
    ///   is no restore point.
    pub fn deactivate(&mut self) -> Result<String, ActivationError> {
        let Some(original) = self.store.get(ORIGINAL_PATH_KEY)? else {
            return Err(ActivationError::NotUnfolded);
        };
        self.write_all(&original)?;
        self.store.delete(ORIGINAL_PATH_KEY)?;
        log_info!("[Fold] PATH restored");
        Ok(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::kv_store::MemoryStore;
    use crate::schemas::errors::StoreError;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    /// A scope whose value the test can observe after the machine takes ownership.
    struct SharedScope(Rc<RefCell<Option<String>>>);

    impl PathScope for SharedScope {
        fn name(&self) -> &'static str {
            "test"
        }
        fn read(&self) -> Result<Option<String>, ActivationError> {
            Ok(self.0.borrow().clone())
        }
        fn write(&mut self, value: &str) -> Result<(), ActivationError> {
            *self.0.borrow_mut() = Some(value.to_string());
            Ok(())
        }
    }

    /// A store whose contents stay visible to the test.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.borrow().get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.borrow_mut().set(key, value)
        }
        fn delete(&mut self, key: &str) -> Result<(), StoreError> {
            self.0.borrow_mut().delete(key)
        }
    }

    fn sep() -> String {
        PATH_SEPARATOR.to_string()
    }

    fn machine(path: Option<&str>) -> (PathActivationMachine, SharedStore, Rc<RefCell<Option<String>>>) {
        let store = SharedStore::default();
        let scope_value = Rc::new(RefCell::new(path.map(str::to_string)));
        let machine = PathActivationMachine::new(
            Box::new(store.clone()),
            vec![Box::new(SharedScope(scope_value.clone()))],
        );
        (machine, store, scope_value)
    }

    fn stored(store: &SharedStore) -> BTreeMap<String, String> {
        store.0.borrow().values.clone()
    }

    #[test]
    fn composes_original_paths_and_root() {
        let original = format!("/usr/bin{0}/bin{0}{0}", sep());
        let active = compose_active_path(&original, &[PathBuf::from("/env/programs/git/bin")], Path::new("/env"));
        assert_eq!(active, format!("/usr/bin{0}/bin{0}/env/programs/git/bin{0}/env", sep()));
    }

    #[test]
    fn empty_original_gets_no_leading_separator() {
        assert_eq!(compose_active_path("", &[], Path::new("/env")), "/env");
    }

    #[test]
    fn activate_then_deactivate_restores_the_exact_string() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("programs/git/bin");
        std::fs::create_dir_all(&bin).unwrap();
        let missing = dir.path().join("programs/git/cmd");
        let original = format!("/usr/bin{}", sep());

        let (mut machine, store, scope) = machine(Some(&original));
        let snapshot = machine.activate(&[bin.clone(), missing], dir.path()).unwrap();

        assert_eq!(snapshot.original, original);
        assert_eq!(stored(&store).get(ORIGINAL_PATH_KEY), Some(&original));
        assert_eq!(
            scope.borrow().as_deref(),
            Some(format!("/usr/bin{0}{1}{0}{2}", sep(), bin.display(), dir.path().display()).as_str())
        );

        assert_eq!(machine.deactivate().unwrap(), original);
        assert_eq!(scope.borrow().as_deref(), Some(original.as_str()));
        assert!(stored(&store).is_empty());
    }

    #[test]
    fn second_activate_fails_without_touching_the_restore_point() {
        let (mut machine, store, scope) = machine(Some("/usr/bin"));
        machine.activate(&[], Path::new("/env")).unwrap();
        let before = stored(&store);
        let path_before = scope.borrow().clone();

        assert!(matches!(
            machine.activate(&[], Path::new("/env")),
            Err(ActivationError::AlreadyUnfolded)
        ));
        assert_eq!(stored(&store), before);
        assert_eq!(*scope.borrow(), path_before);
    }

    #[test]
    fn deactivate_without_restore_point_leaves_path_alone() {
        let (mut machine, store, scope) = machine(Some("/usr/bin"));
        assert!(matches!(machine.deactivate(), Err(ActivationError::NotUnfolded)));
        assert_eq!(scope.borrow().as_deref(), Some("/usr/bin"));
        assert!(stored(&store).is_empty());
    }

    #[test]
    fn missing_path_everywhere_counts_as_empty() {
        let (mut machine, store, scope) = machine(None);
        let snapshot = machine.activate(&[], Path::new("/env")).unwrap();
        assert_eq!(snapshot.original, "");
        assert_eq!(stored(&store).get(ORIGINAL_PATH_KEY).map(String::as_str), Some(""));
        assert_eq!(scope.borrow().as_deref(), Some("/env"));
        // An empty restore point still means "unfolded".
        assert!(machine.is_unfolded().unwrap());
    }

    #[cfg(not(windows))]
    #[test]
    fn later_unfolds_capture_the_live_path_not_the_user_mirror() {
        use crate::libs::kv_store::FileStore;

        let dir = tempfile::tempdir().unwrap();
        // Left behind by an earlier fold.
        FileStore::new(dir.path().join("user-path.json"))
            .set("path", "/usr/bin")
            .unwrap();
        let live = Rc::new(RefCell::new(Some("/opt/new/bin:/usr/bin".to_string())));
        let store = SharedStore::default();
        let mut machine = PathActivationMachine::new(
            Box::new(store.clone()),
            vec![Box::new(UserScope::in_dir(dir.path())), Box::new(SharedScope(live.clone()))],
        );

        let snapshot = machine.activate(&[], Path::new("/env")).unwrap();
        assert_eq!(snapshot.original, "/opt/new/bin:/usr/bin");
        assert_eq!(live.borrow().as_deref(), Some("/opt/new/bin:/usr/bin:/env"));
        let snippet = std::fs::read_to_string(dir.path().join("env.sh")).unwrap();
        assert_eq!(snippet, "export PATH=\"/opt/new/bin:/usr/bin:/env\"\n");

        machine.deactivate().unwrap();
        assert_eq!(live.borrow().as_deref(), Some("/opt/new/bin:/usr/bin"));

        // The shell's PATH moves on between cycles; the next unfold follows it.
        *live.borrow_mut() = Some("/opt/newer/bin:/usr/bin".to_string());
        let snapshot = machine.activate(&[], Path::new("/env")).unwrap();
        assert_eq!(snapshot.original, "/opt/newer/bin:/usr/bin");
        assert_eq!(stored(&store).get(ORIGINAL_PATH_KEY).map(String::as_str), Some("/opt/newer/bin:/usr/bin"));
    }

    #[test]
    fn export_line_escapes_shell_metacharacters() {
        assert_eq!(shell_export_line("/a:$HOME/b"), "export PATH=\"/a:\\$HOME/b\"\n");
    }
}
