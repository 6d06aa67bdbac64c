pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::health::DEFAULT_MAX_AGE;

#[derive(Parser)]
#[command(name = "stockwatch")]
#[command(about = "Notifies when storefront products come back in stock", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/stockwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of parallel workers for fetching product details
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check availability and notify about newly available products
    Check {
        /// Send the status of every product regardless of stored state
        #[arg(short, long)]
        force: bool,

        /// Print the notification instead of sending it
        #[arg(long)]
        dry_run: bool,

        /// Where catalog data comes from
        #[arg(long, value_enum, default_value_t = SourceKind::Chrome)]
        source: SourceKind,
    },
    /// Check the snapshot store and the age of the last successful fetch
    Health {
        /// Maximum age of the last fetch in seconds
        #[arg(long, env = "HEALTHCHECK_INTERVAL", default_value_t = DEFAULT_MAX_AGE.as_secs())]
        max_age: u64,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Check {
            force: false,
            dry_run: false,
            source: SourceKind::Chrome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Headless Chrome reading the storefront's own API traffic
    Chrome,
    /// Direct requests to the storefront API
    Http,
}
