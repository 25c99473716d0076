//! CLI module for tablegate
//!
//! - serve: open the database and run the HTTP gateway
//! - query: one-shot guarded query execution

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
