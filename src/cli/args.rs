//! CLI argument definitions using clap
//!
//! Commands:
//! - tablegate serve [--config <path>] [--host <host>] [--port <port>] [--data-dir <dir>]
//! - tablegate query --sql <sql> [--param <json>]... [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tablegate - HTTP gateway for an embedded SQL database
#[derive(Parser, Debug)]
#[command(name = "tablegate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,

        /// Override the directory holding the database file
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Execute a single guarded SQL statement and print the rows as JSON
    Query {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Statement to run; `?` placeholders bind `--param` values in order
        #[arg(long)]
        sql: String,

        /// JSON scalar bound to the next placeholder (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
