use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use daybook_config::Settings;

mod cache;
mod filter;
mod link;
mod list;

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Append-only plain-text journal with nested blocks and fuzzy filtering")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a journal by a fuzzy term and open the excerpt in the editor
    Filter {
        /// The journal the filter is called from; by default the file to be
        /// filtered is taken from the second line of its sync file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Filter the file given by --file even when it was created as a
        /// filter result
        #[arg(long)]
        ignore_parent: bool,

        /// Kitty window id to record in the sync file
        #[arg(long)]
        parent_id: Option<u32>,

        /// Write the excerpt without opening the editor
        #[arg(long)]
        no_open: bool,

        /// The search term; prompted for when absent
        term: Vec<String>,
    },

    /// Print the blocks still open above a line, for insertion at the cursor
    List {
        file: PathBuf,
        line: u32,

        /// Print tomorrow's date line instead of the open blocks
        #[arg(long)]
        generate_date: bool,
    },

    /// Jump to the journal line behind a position in an excerpt
    Link {
        file: PathBuf,
        line: u32,
        column: u32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Commands::Filter {
            file,
            ignore_parent,
            parent_id,
            no_open,
            term,
        } => filter::run(
            &settings,
            filter::Request {
                file,
                ignore_parent,
                parent_id,
                no_open,
                term,
            },
        ),
        Commands::List {
            file,
            line,
            generate_date,
        } => list::run(&settings, &file, line, generate_date),
        Commands::Link { file, line, column } => link::run(&settings, &file, line, column),
    }
}
