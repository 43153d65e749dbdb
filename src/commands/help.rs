//! The `help` command: a short, colored overview of every command.

use colored::Colorize;

const COMMANDS: [(&str, &str); 6] = [
    ("init", "Create programs/, addons/, projects/, shortcuts/ and the default documents"),
    ("install", "Install or update every enabled module listed in modules.json"),
    ("unfold", "Put the environment's tools on PATH (remembers the current PATH)"),
    ("fold", "Restore PATH exactly as it was before unfold"),
    ("projects", "Open the projects directory"),
    ("help", "Show this message"),
];

pub fn run() {
    println!("{}", "envfold - portable development environment".bold());
    println!();
    println!("{} envfold [--debug] <command>", "Usage:".bold().yellow());
    println!();
    println!("{}", "Commands:".bold().yellow());

    let width = COMMANDS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in COMMANDS {
        let padded = format!("{name:width$}");
        println!("  {}  {}", padded.cyan(), description);
    }

    println!();
    println!(
        "Modules are configured in {} next to the executable; files under {} are copied over each fresh install.",
        "modules.json".cyan(),
        "addons/<module>".cyan()
    );
}
