use crate::model::Category;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "errand", version, about = "Work and travel to-do lists in the terminal")]
pub struct Cli {
    /// Store file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Log file (defaults to errand.log next to the store)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LevelFilter,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List todos in the active category
    List {
        /// Show this category instead of the active one
        #[arg(long)]
        category: Option<Category>,
        /// Show both categories
        #[arg(long, conflicts_with = "category")]
        all: bool,
    },
    /// Add a todo to the active category
    Add {
        /// Text of the todo
        text: String,
        /// Switch to this category before adding
        #[arg(long)]
        category: Option<Category>,
    },
    /// Toggle a todo between open and completed
    Done {
        /// Todo id
        id: String,
    },
    /// Replace the text of a todo
    Edit {
        /// Todo id
        id: String,
        /// New text
        text: String,
    },
    /// Delete a todo
    Delete {
        /// Todo id
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Make a category the active one
    Switch {
        /// work or travel
        category: Category,
    },
    /// Launch the interactive TUI
    Tui,
}
