// Entry point of `envfold`.
// Parses the command line, sets up logging, resolves the environment root and
// dispatches to the command modules.

mod cli;
mod commands;
mod installers;
mod libs;
mod logger;
mod schemas;

use clap::Parser;
use colored::Colorize;

use crate::cli::cmd_enums::{Cli, Commands};
use crate::commands::{fold, help, init, install, projects, unfold};
use crate::libs::paths::{EnvironmentLayout, has_portable_characters, resolve_root};

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let root = resolve_root(cli.root);
    if !has_portable_characters(&root) {
        log_warn!(
            "The environment root {} contains spaces or special characters; some tools may not work from here.",
            root.display().to_string().yellow()
        );
    }
    let layout = EnvironmentLayout::new(root);

    let result = match cli.command {
        None | Some(Commands::Help) => {
            help::run();
            Ok(())
        }
        Some(Commands::Init) => init::run(&layout),
        Some(Commands::Install) => install::run(layout),
        Some(Commands::Projects) => projects::run(layout),
        Some(Commands::Unfold) => unfold::run(layout),
        Some(Commands::Fold) => fold::run(layout),
        Some(Commands::Other(args)) => {
            let name = args.first().map(String::as_str).unwrap_or_default();
            log_error!("Unrecognised command! '{}' (see `envfold help`)", name.red());
            Ok(())
        }
    };

    if let Err(e) = result {
        log_error!("{:#}", e);
        std::process::exit(1);
    }
}
