//! # Modules Document Schema (`modules.json`)
//!
//! `modules.json` is both the user's module configuration and the version
//! ledger: the `version` field of every entry is rewritten after a successful
//! install.
//!
//! ## Example
//!
//! ```json
//! {
//!   "generic": [
//!     {
//!       "name": "NodeJS",
//!       "enabled": true,
//!       "version": "0.0",
//!       "url": "https://nodejs.org/dist/latest/",
//!       "pattern": "node-v([0-9.]+)-win-x64\\.zip",
//!       "paths": ["."]
//!     }
//!   ],
//!   "registry-npm": [
//!     { "name": "typescript", "enabled": true, "version": "0.0" }
//!   ],
//!   "registry-composer": [
//!     { "name": "laravel/installer", "enabled": false, "version": "0.0" }
//!   ]
//! }
//! ```
//!
//! Older documents used the keys `programs`, `npm` and `composer`; both spellings are read.
//!
//! Sections are read as raw JSON values and each entry is converted on its
//! own, so one hand-edited mistake only costs that entry.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::schemas::version_token::NEVER_INSTALLED;

/// The three sections of the modules document. Each maps to one installer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    Generic,
    Npm,
    Composer,
}

impl ModuleCategory {
    pub const ALL: [ModuleCategory; 3] = [
        ModuleCategory::Generic,
        ModuleCategory::Npm,
        ModuleCategory::Composer,
    ];

    /// Section key written by `init`.
    pub fn key(self) -> &'static str {
        match self {
            ModuleCategory::Generic => "generic",
            ModuleCategory::Npm => "registry-npm",
            ModuleCategory::Composer => "registry-composer",
        }
    }

    /// Section key used by older documents.
    pub fn legacy_key(self) -> &'static str {
        match self {
            ModuleCategory::Generic => "programs",
            ModuleCategory::Npm => "npm",
            ModuleCategory::Composer => "composer",
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The whole `modules.json` document, as read at start-up. Entries stay
/// untyped until `ModuleEntry::from_value` looks at them.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModulesDocument {
    #[serde(default, alias = "programs")]
    pub generic: Vec<Value>,
    #[serde(default, rename = "registry-npm", alias = "npm")]
    pub npm: Vec<Value>,
    #[serde(default, rename = "registry-composer", alias = "composer")]
    pub composer: Vec<Value>,
}

impl ModulesDocument {
    /// Raw entries of one section, in document order.
    pub fn entries(&self, category: ModuleCategory) -> &[Value] {
        match category {
            ModuleCategory::Generic => &self.generic,
            ModuleCategory::Npm => &self.npm,
            ModuleCategory::Composer => &self.composer,
        }
    }
}

/// One configured module. `url`, `pattern` and `paths` only mean something in
/// the `generic` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_version", deserialize_with = "version_text")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Module-relative directories appended to PATH on `unfold`.
    #[serde(default, alias = "path", skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl ModuleEntry {
    /// Converts one raw section entry.
    ///
    /// # Arguments
    /// * `value`: The entry exactly as it appears in the document.
    ///
    /// # Returns
    /// The typed entry, or the serde error describing what is wrong with it
    /// (not an object, no `name`, a `paths` that is not a list...).
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        ModuleEntry::deserialize(value)
    }
}

/// `version` as written by hand: `"2.4"` and `2.4` mean the same thing.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionText {
    Text(String),
    Number(serde_json::Number),
}

fn version_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match VersionText::deserialize(deserializer)? {
        VersionText::Text(text) => text,
        VersionText::Number(number) => number.to_string(),
    })
}

fn default_enabled() -> bool {
    true
}

fn default_version() -> String {
    NEVER_INSTALLED.to_string()
}
