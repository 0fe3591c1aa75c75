//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod cache;
mod scrape;
mod values;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "orderscout")]
#[command(about = "Order-award announcement monitor for exchange disclosure portals")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery of orderscout.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape order awards announced on a date
    Scrape {
        /// Announcement date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Print the result as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Replay saved listing pages instead of driving a browser
        #[arg(long, num_args = 1..)]
        replay: Vec<PathBuf>,

        /// Number of orders to show in the summary
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Inspect the on-disk result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Extract order values from a text or PDF file
    Values {
        /// File to read
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cached dates, newest first
    List,

    /// Print the cached result for a date
    Show {
        /// Date (YYYY-MM-DD)
        date: String,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        ignore_env: false,
    };
    let settings = load_settings(&options)?;

    match cli.command {
        Commands::Scrape {
            date,
            json,
            replay,
            top,
        } => scrape::cmd_scrape(&settings, &date, json, &replay, top).await,
        Commands::Cache { command } => match command {
            CacheCommands::List => cache::cmd_cache_list(&settings),
            CacheCommands::Show { date } => cache::cmd_cache_show(&settings, &date),
        },
        Commands::Values { file } => values::cmd_values(&file).await,
    }
}
