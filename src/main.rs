use anyhow::Result;
use clap::Parser;
use errand::cli::{Cli, Command};
use errand::commands;
use errand::config::Settings;
use errand::logging;

fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = Settings::resolve(&args)?;
    logging::init(&settings);
    log::info!("errand starting, store at {:?}", settings.store_path);

    let command = args.command.unwrap_or(Command::Tui);
    match command {
        Command::List { category, all } => commands::list(&settings, category, all),
        Command::Add { text, category } => commands::add(&settings, text, category),
        Command::Done { id } => commands::toggle(&settings, id),
        Command::Edit { id, text } => commands::edit(&settings, id, text),
        Command::Delete { id, yes } => commands::delete(&settings, id, yes),
        Command::Switch { category } => commands::switch(&settings, category),
        Command::Tui => commands::tui(&settings),
    }
}
