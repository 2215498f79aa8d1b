//! Command line interface.

use clap::{Parser, Subcommand};

/// Serves archived blockchain data with cryptographic inclusion proofs.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML config file; created from the default template when
    /// missing.
    #[arg(long, default_value = "./config.yml", help = "Path to the config file")]
    pub config: String,

    /// The command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run the request server.
    Start,
    /// Run the ingest crawler.
    Crawler,
    /// Print the version and exit.
    Version,
}
