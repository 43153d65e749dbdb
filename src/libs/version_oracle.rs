//! # Version Oracle
//!
//! Answers one question per module: is there a version newer than the one
//! recorded in the ledger, and if so, which one and where is it?
//!
//! Generic modules are scraped from a vendor page. The configured URL is
//! checked with HEAD first: many vendors publish a stable "latest" link that
//! redirects straight to the artifact, in which case the redirect target
//! itself is scanned and the page is never downloaded. Every match of the
//! version pattern is considered and the highest version wins, so page order
//! (newest-first, oldest-first, mixed) does not matter.
//!
//! Registry modules ask their package manager.

use colored::Colorize;
use regex::Regex;
use std::path::Path;

use crate::libs::http_client::HttpClient;
use crate::libs::process_runner::ProcessRunner;
use crate::schemas::errors::ModuleError;
use crate::schemas::module_spec::GenericSource;
use crate::schemas::pipeline::{Locator, PendingUpdate};
use crate::schemas::version_token::VersionToken;
use crate::{log_debug, log_info};

/// Compiles a version pattern; group 1 must capture the version.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ModuleError> {
    let regex = Regex::new(pattern).map_err(|e| ModuleError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if regex.captures_len() < 2 {
        return Err(ModuleError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "the pattern needs a capturing group around the version".to_string(),
        });
    }
    Ok(regex)
}

/// Highest version among all matches, with the full text of the match that produced it.
/// The first of several equal versions wins.
pub fn best_match(pattern: &Regex, page: &str) -> Option<(VersionToken, String)> {
    let mut best: Option<(VersionToken, String)> = None;
    for captures in pattern.captures_iter(page) {
        let (Some(whole), Some(group)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let version = match VersionToken::parse(group.as_str()) {
            Ok(version) => version,
            Err(e) => {
                log_debug!("[Oracle] Ignoring match '{}': {}", whole.as_str(), e);
                continue;
            }
        };
        if best.as_ref().is_none_or(|(current, _)| version > *current) {
            best = Some((version, whole.as_str().to_string()));
        }
    }
    best
}

/// Keeps `candidate` only if it is strictly newer than what is installed.
fn newer(candidate: VersionToken, current: &VersionToken, source_name: &str) -> Option<VersionToken> {
    if candidate > *current {
        log_info!(
            "[Oracle] {}: {} available (installed: {})",
            source_name.bold(),
            candidate.to_string().green(),
            current
        );
        Some(candidate)
    } else {
        log_debug!("[Oracle] {}: latest {} is not newer than {}", source_name, candidate, current);
        None
    }
}

/// Scrapes the newest version of a generic module.
///
/// # Arguments
/// * `http`: The HTTP seam, used for one HEAD request and possibly one GET.
/// * `source`: The module's page URL, version pattern and activation paths.
/// * `current`: The version recorded in the ledger.
///
/// # Returns
/// * `Ok(Some(PendingUpdate))` with a `Locator` when a strictly newer version exists.
/// * `Ok(None)` when nothing matched or nothing newer was found.
/// * `Err(ModuleError::InvalidPattern | Network)` otherwise.
pub fn detect_generic(
    http: &dyn HttpClient,
    source: &GenericSource,
    current: &VersionToken,
) -> Result<Option<PendingUpdate>, ModuleError> {
    let pattern = compile_pattern(&source.pattern)?;

    let resolved_url = http.resolve(&source.url)?;
    let page = if resolved_url != source.url {
        log_debug!("[Oracle] {} redirects to {}", source.url, resolved_url.cyan());
        resolved_url.clone()
    } else {
        http.fetch_text(&source.url)?
    };

    let Some((candidate, matched_text)) = best_match(&pattern, &page) else {
        log_debug!("[Oracle] No version found on {}", source.url);
        return Ok(None);
    };
    Ok(newer(candidate, current, &source.url).map(|version| PendingUpdate {
        version,
        locator: Some(Locator {
            configured_url: source.url.clone(),
            resolved_url,
            matched_text,
        }),
    }))
}

/// `npm view <name> version` prints the latest version on its own line.
pub fn parse_npm_view_output(stdout: &str) -> Option<VersionToken> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| VersionToken::parse(line.trim_matches('\'')).ok())
}

/// Reads the `versions : * v2.3.1, v2.3.0, 2.2.x-dev, dev-main` line of
/// `composer show --all` and returns the highest dotted-numeric release.
pub fn parse_composer_versions(stdout: &str) -> Option<VersionToken> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("versions"))?;
    let (_, list) = line.split_once(':')?;
    list.split(',')
        .map(|entry| entry.trim().trim_start_matches('*').trim())
        .filter(|entry| !entry.starts_with("dev-"))
        .filter_map(|entry| VersionToken::parse(entry).ok())
        .max()
}

/// Asks npm for the latest published version.
pub fn detect_npm(
    runner: &dyn ProcessRunner,
    npm: &Path,
    name: &str,
    current: &VersionToken,
) -> Result<Option<PendingUpdate>, ModuleError> {
    let output = runner.run(npm, &["view", name, "version"])?;
    let candidate = parse_npm_view_output(&output.stdout).ok_or_else(|| ModuleError::VersionRetrieval {
        source_name: format!("npm ({name})"),
        reason: first_line_or(&output.combined(), "empty output"),
    })?;
    Ok(newer(candidate, current, name).map(|version| PendingUpdate {
        version,
        locator: None,
    }))
}

/// Asks composer for every published version of `namespace/package`.
pub fn detect_composer(
    runner: &dyn ProcessRunner,
    composer: &Path,
    identity: &str,
    current: &VersionToken,
) -> Result<Option<PendingUpdate>, ModuleError> {
    let output = runner.run(composer, &["show", "--all", "--no-ansi", identity])?;
    let candidate = parse_composer_versions(&output.stdout).ok_or_else(|| ModuleError::VersionRetrieval {
        source_name: format!("composer ({identity})"),
        reason: first_line_or(&output.combined(), "no release versions listed"),
    })?;
    Ok(newer(candidate, current, identity).map(|version| PendingUpdate {
        version,
        locator: None,
    }))
}

fn first_line_or(text: &str, fallback: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
