// This file implements the application's logging system.
// It provides macros for different log levels (INFO, WARN, ERROR, DEBUG)
// and handles conditional output, especially for debug messages, with colored terminal output.
// Every line is prefixed with the local wall-clock time so long install batches
// can be followed after the fact.

use std::sync::OnceLock; // Ensures the DEBUG_ENABLED flag is initialized exactly once.
use std::sync::atomic::{AtomicBool, Ordering}; // Thread-safe control of the debug flag.

/// Provides convenient logging macros.
/// `#[macro_export]` makes these macros globally available within the crate.
/// Callers must have `colored::Colorize` in scope.

// `log_info!` for general application progress and informational messages.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (eprintln!("{} {} {}", $crate::logger::timestamp().dimmed(), "[INFO]".bright_green(), format!($($arg)*)));
}

// `log_warn!` for non-critical issues or noteworthy conditions.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (eprintln!("{} {} {}", $crate::logger::timestamp().dimmed(), "[WARN]".bright_yellow(), format!($($arg)*)));
}

// `log_error!` for failures. Per-module failures are logged, never fatal.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (eprintln!("{} {} {}", $crate::logger::timestamp().dimmed(), "[ERROR]".bright_red(), format!($($arg)*)));
}

// `log_debug!` for detailed internal tracing.
// Messages are only printed if debug mode is enabled via `is_debug_enabled()`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
           eprintln!("{} {} {}", $crate::logger::timestamp().dimmed(), "[DEBUG]".dimmed(), format!($($arg)*));
        }
    };
}

// Global flag to control debug logging, ensured to be initialized once.
static DEBUG_ENABLED: OnceLock<AtomicBool> = OnceLock::new();

/// Initializes the logger, setting the global debug mode.
/// This function should be called once at application startup.
///
/// # Arguments
/// * `debug`: If `true`, enables debug logging; otherwise, only info, warn, and error messages are printed.
pub fn init(debug: bool) {
    DEBUG_ENABLED
        .get_or_init(|| AtomicBool::new(debug)) // Initialize if not already set.
        .store(debug, Ordering::Relaxed); // Update the flag with the provided debug value.

    if debug {
        use colored::Colorize;
        crate::log_debug!("Logger initialized in DEBUG mode");
    }
}

/// Checks if debug logging is currently enabled.
/// Used primarily by the `log_debug!` macro.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED
        .get() // Attempt to retrieve the AtomicBool.
        .map(|f| f.load(Ordering::Relaxed)) // Load its value if present.
        .unwrap_or(false) // Default to false if `init` was never called.
}

/// Local time formatted as `[HH:MM:SS]`, the prefix of every log line.
pub fn timestamp() -> String {
    chrono::Local::now().format("[%H:%M:%S]").to_string()
}
