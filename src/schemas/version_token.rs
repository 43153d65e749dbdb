//! # Version Tokens
//!
//! Dotted-numeric versions as they appear on vendor download pages, in
//! `npm view` output and in the `version` field of `modules.json`.
//!
//! Ordering is component-wise and numeric, never lexicographic: `1.2 < 1.10 < 2.0`.
//! A shorter sequence compares as if padded with zeros, so `1.0` and `1.0.0`
//! are the same version. Equality and hashing follow the ordering, which keeps
//! `Ord`, `Eq` and `Hash` consistent with each other.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// The version recorded for a module that has never been installed.
pub const NEVER_INSTALLED: &str = "0.0";

/// Why a string could not be read as a dotted-numeric version.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,
    #[error("invalid version component `{component}` in `{input}`")]
    InvalidComponent { input: String, component: String },
}

/// A parsed dotted-numeric version such as `3.11.2`.
#[derive(Debug, Clone)]
pub struct VersionToken {
    components: Vec<u64>,
}

impl VersionToken {
    /// The `0.0` version every module starts from.
    pub fn never_installed() -> Self {
        VersionToken {
            components: vec![0, 0],
        }
    }

    /// Parses a dotted-numeric string. Surrounding whitespace and a single
    /// leading `v`/`V` are tolerated (`v1.4.0` is common in tags).
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let components = trimmed
            .split('.')
            .map(|component| {
                component
                    .parse::<u64>()
                    .map_err(|_| VersionParseError::InvalidComponent {
                        input: input.to_string(),
                        component: component.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionToken { components })
    }

    /// The numeric components, in order.
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    // Components with trailing zeros removed; the canonical form for Eq/Hash.
    fn significant(&self) -> &[u64] {
        let end = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..end]
    }
}

impl Default for VersionToken {
    fn default() -> Self {
        VersionToken::never_installed()
    }
}

impl FromStr for VersionToken {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionToken::parse(s)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let left = self.components.get(i).copied().unwrap_or(0);
            let right = other.components.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionToken {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionToken {}

impl Hash for VersionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}
