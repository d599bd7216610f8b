//! Command-line interface for two_duel.

use clap::{Parser, Subcommand};

/// Two Duel - head-to-head arithmetic puzzle server
#[derive(Parser, Debug)]
#[command(name = "two_duel")]
#[command(about = "Matchmaking server for two-player sign puzzles", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket duel server
    Serve {
        /// Path to the server configuration file (defaults used if missing)
        #[arg(short, long, default_value = "two_duel.toml")]
        config: std::path::PathBuf,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file and environment)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print one generated problem as JSON
    Problem {
        /// Number of terms
        #[arg(short, long, default_value = "3")]
        length: usize,
    },
}
