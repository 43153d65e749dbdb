//! # Module Specifications
//!
//! `ModuleSpec` is the validated, typed form of a `modules.json` entry. The
//! orchestrator owns the list for the duration of a run and never mutates it;
//! the live version of each module is tracked in `EnvironmentState`.

use crate::schemas::modules_file::{ModuleCategory, ModuleEntry};
use crate::schemas::version_token::{VersionParseError, VersionToken};

/// Why a configured entry was rejected at load time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModuleSpecError {
    #[error("invalid name \"{0}\": names must not contain whitespace")]
    WhitespaceInName(String),
    #[error("invalid name \"{0}\": composer packages are written as \"namespace/package\"")]
    MalformedComposerName(String),
    #[error("module \"{name}\" is missing the `{field}` field")]
    MissingField { name: String, field: &'static str },
    #[error("module \"{name}\" has an unreadable version: {source}")]
    BadVersion {
        name: String,
        #[source]
        source: VersionParseError,
    },
}

/// Where a generic module's version and artifact come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericSource {
    /// Page (or "latest" link) that is scanned for versions.
    pub url: String,
    /// Regex with one capturing group that yields the dotted version.
    pub pattern: String,
    /// Module-relative directories contributed to PATH once installed.
    pub activation_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind {
    Generic(GenericSource),
    Npm,
    Composer { namespace: String, package: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    /// The identity as written in `modules.json` (`namespace/package` for composer).
    pub name: String,
    pub kind: ModuleKind,
    /// Version recorded in the ledger when the run started.
    pub current_version: VersionToken,
}

impl ModuleSpec {
    /// Validates one `modules.json` entry of the given section.
    pub fn from_entry(category: ModuleCategory, entry: &ModuleEntry) -> Result<Self, ModuleSpecError> {
        let name = entry.name.trim().to_string();
        if name.is_empty() || entry.name.chars().any(char::is_whitespace) {
            return Err(ModuleSpecError::WhitespaceInName(entry.name.clone()));
        }

        let kind = match category {
            ModuleCategory::Generic => {
                let url = required(&name, "url", entry.url.as_deref())?;
                let pattern = required(&name, "pattern", entry.pattern.as_deref())?;
                ModuleKind::Generic(GenericSource {
                    url,
                    pattern,
                    activation_paths: entry.paths.clone(),
                })
            }
            ModuleCategory::Npm => ModuleKind::Npm,
            ModuleCategory::Composer => {
                let parts: Vec<&str> = name.split('/').collect();
                match parts.as_slice() {
                    [namespace, package] if !namespace.is_empty() && !package.is_empty() => {
                        ModuleKind::Composer {
                            namespace: namespace.to_string(),
                            package: package.to_string(),
                        }
                    }
                    _ => return Err(ModuleSpecError::MalformedComposerName(name)),
                }
            }
        };

        let current_version =
            VersionToken::parse(&entry.version).map_err(|source| ModuleSpecError::BadVersion {
                name: name.clone(),
                source,
            })?;

        Ok(ModuleSpec {
            name,
            kind,
            current_version,
        })
    }

    pub fn category(&self) -> ModuleCategory {
        match self.kind {
            ModuleKind::Generic(_) => ModuleCategory::Generic,
            ModuleKind::Npm => ModuleCategory::Npm,
            ModuleKind::Composer { .. } => ModuleCategory::Composer,
        }
    }

    /// Directory name under `programs/` and `addons/`.
    pub fn directory_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Activation paths declared for this module (empty for registry kinds).
    pub fn activation_paths(&self) -> &[String] {
        match &self.kind {
            ModuleKind::Generic(source) => &source.activation_paths,
            _ => &[],
        }
    }
}

fn required(name: &str, field: &'static str, value: Option<&str>) -> Result<String, ModuleSpecError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ModuleSpecError::MissingField {
            name: name.to_string(),
            field,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> ModuleEntry {
        ModuleEntry {
            name: name.to_string(),
            enabled: true,
            version: "0.0".to_string(),
            url: Some("https://example.org/downloads/".to_string()),
            pattern: Some(r"tool-([0-9.]+)\.zip".to_string()),
            paths: vec!["bin".to_string()],
        }
    }

    #[test]
    fn generic_entry_becomes_generic_spec() {
        let spec = ModuleSpec::from_entry(ModuleCategory::Generic, &entry("Python")).unwrap();
        assert_eq!(spec.category(), ModuleCategory::Generic);
        assert_eq!(spec.directory_name(), "python");
        assert_eq!(spec.activation_paths(), ["bin".to_string()]);
        assert_eq!(spec.current_version, VersionToken::never_installed());
    }

    #[test]
    fn names_with_whitespace_are_rejected() {
        let err = ModuleSpec::from_entry(ModuleCategory::Npm, &entry("my tool")).unwrap_err();
        assert!(matches!(err, ModuleSpecError::WhitespaceInName(_)));
    }

    #[test]
    fn composer_names_need_exactly_one_slash() {
        let ok = ModuleSpec::from_entry(ModuleCategory::Composer, &entry("laravel/installer")).unwrap();
        assert_eq!(
            ok.kind,
            ModuleKind::Composer {
                namespace: "laravel".to_string(),
                package: "installer".to_string()
            }
        );
        for bad in ["laravel", "a/b/c", "/installer", "laravel/"] {
            assert!(
                matches!(
                    ModuleSpec::from_entry(ModuleCategory::Composer, &entry(bad)),
                    Err(ModuleSpecError::MalformedComposerName(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn generic_entry_without_pattern_is_rejected() {
        let mut e = entry("Git");
        e.pattern = None;
        assert_eq!(
            ModuleSpec::from_entry(ModuleCategory::Generic, &e),
            Err(ModuleSpecError::MissingField {
                name: "Git".to_string(),
                field: "pattern"
            })
        );
    }

    #[test]
    fn registry_entries_have_no_activation_paths() {
        let spec = ModuleSpec::from_entry(ModuleCategory::Npm, &entry("typescript")).unwrap();
        assert!(spec.activation_paths().is_empty());
    }
}
