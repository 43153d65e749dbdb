// Values handed from one pipeline stage to the next.

use crate::schemas::version_token::VersionToken;

/// Where a generic module's artifact was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// The URL from `modules.json`.
    pub configured_url: String,
    /// Where the configured URL lands after redirects.
    pub resolved_url: String,
    /// The full text the version pattern matched (often the artifact file name).
    pub matched_text: String,
}

impl Locator {
    /// The configured URL redirected somewhere else (e.g. a "latest" link).
    pub fn was_redirected(&self) -> bool {
        self.resolved_url != self.configured_url
    }
}

/// A newer version is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub version: VersionToken,
    /// Present for generic modules only; registry modules are located by name.
    pub locator: Option<Locator>,
}

/// Result of a successful install. Failures travel as `Err(ModuleError)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: VersionToken,
    /// Module-relative directories `unfold` will put on PATH.
    pub activation_paths: Vec<String>,
}
