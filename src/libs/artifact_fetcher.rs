//! # Artifact Fetcher
//!
//! Turns a `Locator` into a file in the scratch directory.
//!
//! The transfer runs on a scoped worker thread; the calling thread blocks on
//! the worker's channel, forwarding percentage events to the progress bar
//! until the worker reports completion. Bytes land in `<file>.part`, which is
//! renamed only once the whole body has arrived, so a half-written artifact
//! is never mistaken for a finished one.

use colored::Colorize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::libs::http_client::HttpClient;
use crate::libs::utilities::file_operations::remove_path;
use crate::libs::utilities::progress::{DOWNLOAD_LABEL, PRIMING_LABEL, ProgressSink, percent_of};
use crate::schemas::errors::ModuleError;
use crate::schemas::pipeline::Locator;
use crate::{log_debug, log_info};

/// Creates a progress sink for a transfer with the given label.
pub type ProgressFactory<'a> = &'a dyn Fn(&str) -> Box<dyn ProgressSink>;

/// Hosts whose first request only returns a "your download will start" page;
/// the real artifact arrives on the second request.
const PRIMED_HOSTS: &[&str] = &["sourceforge.net"];

/// Splits `scheme://host[:port]` from the rest of a URL.
fn split_origin(url: &str) -> Option<(&str, &str)> {
    let scheme_end = url.find("://")? + 3;
    let path_start = url[scheme_end..]
        .find(['/', '?', '#'])
        .map(|i| scheme_end + i)
        .unwrap_or(url.len());
    Some((&url[..path_start], &url[path_start..]))
}

fn host_of(url: &str) -> Option<&str> {
    let (origin, _) = split_origin(url)?;
    let authority = &origin[origin.find("://")? + 3..];
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    Some(authority.split(':').next().unwrap_or(authority))
}

/// Where the artifact is downloaded from.
///
/// A redirected HEAD request already points at the artifact. Otherwise the matched
/// text is the link: absolute as-is, root-relative against the configured
/// origin, anything else relative to the configured URL.
pub fn resolve_download_url(locator: &Locator) -> String {
    if locator.was_redirected() {
        return locator.resolved_url.clone();
    }
    let matched = locator.matched_text.trim();
    if matched.contains("://") {
        return matched.to_string();
    }
    if matched.starts_with('/') {
        if let Some((origin, _)) = split_origin(&locator.configured_url) {
            return format!("{origin}{matched}");
        }
    }
    format!(
        "{}/{}",
        locator.configured_url.trim_end_matches('/'),
        matched.trim_start_matches('/')
    )
}

/// File name for a download URL: the last path segment that contains a dot,
/// so `.../app-1.2.zip/download` still yields `app-1.2.zip`.
pub fn file_name_from_url(url: &str, fallback: &str) -> String {
    let path = split_origin(url).map_or(url, |(_, path)| path);
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit('/')
        .find(|segment| segment.contains('.'))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

pub fn needs_priming(url: &str) -> bool {
    host_of(url).is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        PRIMED_HOSTS.iter().any(|primed| host.contains(primed))
    })
}

enum TransferEvent {
    Progress(u8),
    Finished(Result<u64, ModuleError>),
}

/// Downloads `url` to `target` through `<target>.part`.
fn transfer(
    http: &dyn HttpClient,
    url: &str,
    target: &Path,
    progress: &dyn ProgressSink,
) -> Result<u64, ModuleError> {
    let mut partial_name = target.file_name().unwrap_or_default().to_os_string();
    partial_name.push(".part");
    let partial = target.with_file_name(partial_name);

    let (events, receiver) = mpsc::channel::<TransferEvent>();
    let outcome = thread::scope(|scope| {
        let worker_partial = partial.clone();
        scope.spawn(move || {
            let result = File::create(&worker_partial)
                .map_err(ModuleError::io("cannot create", &worker_partial))
                .and_then(|mut file| {
                    let mut last = None;
                    http.download(url, &mut file, &mut |received, total| {
                        if let Some(total) = total {
                            let percent = percent_of(received, total);
                            if last != Some(percent) {
                                last = Some(percent);
                                let _ = events.send(TransferEvent::Progress(percent));
                            }
                        }
                    })
                });
            let _ = events.send(TransferEvent::Finished(result));
        });

        let mut finished = None;
        for event in receiver.iter() {
            match event {
                TransferEvent::Progress(percent) => progress.update(percent),
                TransferEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
            }
        }
        finished
    });
    progress.finish();

    let outcome = outcome.unwrap_or_else(|| {
        Err(ModuleError::Network {
            url: url.to_string(),
            message: "download worker stopped without reporting".to_string(),
        })
    });
    match outcome {
        Ok(bytes) => {
            fs::rename(&partial, target).map_err(ModuleError::io("cannot finalize download", target))?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = remove_path(&partial);
            Err(e)
        }
    }
}

/// Downloads the artifact named by `locator` into `scratch_dir`.
///
/// Primed hosts (see `PRIMED_HOSTS`) are requested twice and only the second
/// body is kept. Progress is reported through a fresh sink per transfer.
///
/// # Arguments
/// * `http`: The HTTP seam; shared with the worker thread for the transfer.
/// * `locator`: Where the version oracle found the artifact.
/// * `module_name`: Used in log lines and as the file name when the URL has none.
/// * `scratch_dir`: Created if missing; the artifact lands directly inside it.
/// * `make_progress`: Builds the progress sink for a label (`[DOWNLOAD]`, `[INITIALZ]`).
///
/// # Returns
/// * `Ok(PathBuf)` of the complete artifact. No `.part` file is left behind.
/// * `Err(ModuleError::Network)` for transport or HTTP failures,
///   `Err(ModuleError::Io)` if the file could not be written or renamed.
pub fn fetch(
    http: &dyn HttpClient,
    locator: &Locator,
    module_name: &str,
    scratch_dir: &Path,
    make_progress: ProgressFactory<'_>,
) -> Result<PathBuf, ModuleError> {
    fs::create_dir_all(scratch_dir).map_err(ModuleError::io("cannot create", scratch_dir))?;

    let url = resolve_download_url(locator);
    let target = scratch_dir.join(file_name_from_url(&url, module_name));
    log_info!("[Fetch] {} from {}", module_name.bold(), url.blue());

    if needs_priming(&url) {
        log_debug!("[Fetch] Priming {} before the real download", url);
        let progress = make_progress(PRIMING_LABEL);
        transfer(http, &url, &target, progress.as_ref())?;
        remove_path(&target).map_err(ModuleError::io("cannot discard", &target))?;
    }

    let progress = make_progress(DOWNLOAD_LABEL);
    let bytes = transfer(http, &url, &target, progress.as_ref())?;
    log_debug!(
        "[Fetch] {} byte(s) saved to {}",
        bytes,
        target.display().to_string().cyan()
    );
    Ok(target)
}
