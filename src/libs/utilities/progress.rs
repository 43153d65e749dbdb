// Progress reporting for downloads and package-manager installs.
//
// Producers only ever call `update(percent)`; nothing waits on the sink,
// so a slow terminal never slows a transfer down.

use indicatif::{ProgressBar, ProgressStyle};

/// Label shown while an artifact is downloading.
pub const DOWNLOAD_LABEL: &str = "[DOWNLOAD]";
/// Label shown for the throw-away first request to hosts that need priming.
pub const PRIMING_LABEL: &str = "[INITIALZ]";
/// Label shown while a package manager installs.
pub const INSTALL_LABEL: &str = "[INSTALLS]";

/// Receives percentage updates (0..=100).
pub trait ProgressSink {
    fn update(&self, percent: u8);
    fn finish(&self);
}

/// A terminal progress bar: `[DOWNLOAD]: [=====     ] 40%`.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(label: &str) -> Self {
        let style = ProgressStyle::with_template("{prefix}: [{bar:40}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        BarProgress { bar }
    }
}

impl ProgressSink for BarProgress {
    fn update(&self, percent: u8) {
        self.bar.set_position(u64::from(percent.min(100)));
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Discards every update.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn update(&self, _percent: u8) {}
    fn finish(&self) {}
}

/// Integer percentage of `done` out of `total`, clamped to 100.
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (done.saturating_mul(100) / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_are_clamped() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(1, 4), 25);
        assert_eq!(percent_of(10, 4), 100);
    }
}
