use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Defines the command-line interface (CLI) for 'envfold'.
/// `#[derive(Parser)]` automatically generates argument parsing code via `clap`.
#[derive(Parser)]
#[command(name = "envfold", version)]
#[command(about = "Portable development environment: install tools locally, fold and unfold them onto PATH")]
#[command(disable_help_subcommand = true)] // `help` is our own command, not clap's.
pub struct Cli {
    /// Enables detailed debug output for troubleshooting and development.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    /// Environment root. Defaults to the directory holding the executable.
    #[arg(long, global = true, env = "ENVFOLD_ROOT", hide = true)]
    pub(crate) root: Option<PathBuf>,

    /// No command prints the help text.
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

/// Every command the environment understands.
#[derive(Subcommand)]
pub enum Commands {
    /// Creates the environment layout and default documents in the root.
    Init,
    /// Shows the available commands.
    Help,
    /// Installs or updates every enabled module.
    Install,
    /// Opens the projects directory in the file manager.
    Projects,
    /// Puts the environment's tools on PATH.
    Unfold,
    /// Restores PATH to what it was before `unfold`.
    Fold,
    /// Anything else; reported and ignored.
    #[command(external_subcommand)]
    Other(Vec<String>),
}
