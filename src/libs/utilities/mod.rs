// Small building blocks shared by the pipeline components.

// Archive format detection and extraction.
pub mod compression;
// Recursive copy, move with cross-device fallback, tolerant removal.
pub mod file_operations;
// PATH separator, hook script, tool lookup, directory opener.
pub mod platform;
// indicatif progress bars behind a small trait.
pub mod progress;
