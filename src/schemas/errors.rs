//! # Error Types
//!
//! Typed errors for the install pipeline, the ledger, the key-value store and
//! the PATH activation machine.
//!
//! `ModuleError` never escapes the batch: the orchestrator catches it per module,
//! logs it together with the module name and moves on. `ActivationError` is
//! reported to the user and aborts `fold`/`unfold` before anything is mutated.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::schemas::version_token::VersionParseError;

/// Everything that can stop a single module from being checked or installed.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A package manager the module depends on is not available.
    #[error("{tool} is not installed")]
    PrerequisiteMissing { tool: &'static str },

    /// Transport failure while talking to a remote host.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The remote answered, but no usable version could be read from it.
    #[error("unable to retrieve version from {source_name}: {reason}")]
    VersionRetrieval { source_name: String, reason: String },

    /// The configured version-detection rule is not a usable regex.
    #[error("invalid version pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An external tool ran but its output carried a known failure marker.
    #[error("{tool} reported a failure:\n{output}")]
    ToolFailure { tool: String, output: String },

    #[error("{action} ({path}): {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Version(#[from] VersionParseError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ModuleError {
    /// Wraps an `io::Error` with what was being attempted and on which path.
    pub fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> ModuleError {
        let path = path.into();
        move |source| ModuleError::Io {
            action,
            path,
            source,
        }
    }
}

/// Failures reading or rewriting `modules.json`.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the durable key-value store holding the PATH restore point.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key-value store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("key-value store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[cfg(windows)]
    #[error("registry access failed: {0}")]
    Registry(#[source] io::Error),
}

/// Reasons `unfold`/`fold` refuse to run or fail midway.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("environment is already unfolded, fold it first")]
    AlreadyUnfolded,
    #[error("environment is not unfolded, unfold it first")]
    NotUnfolded,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot update PATH in {scope} scope: {reason}")]
    Scope { scope: &'static str, reason: String },
}

/// Failures loading the environment documents at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot expand projects directory `{value}`: {reason}")]
    Expand { value: String, reason: String },
}
