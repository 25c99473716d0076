//! CLI command implementations

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use crate::database::Database;
use crate::gateway::GatewayService;
use crate::http_server::{GatewayConfig, HttpServer};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}

/// Dispatch one command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            serve(config)
        }
        Command::Query {
            config,
            sql,
            params,
        } => {
            let config = load_config(config.as_deref())?;
            let rows = query(&config, &sql, &params)?;
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &rows)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<GatewayConfig> {
    match path {
        Some(path) => GatewayConfig::load(path),
        None => Ok(GatewayConfig::default()),
    }
}

/// Boot the server and block until it shuts down
pub fn serve(config: GatewayConfig) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to start runtime: {}", e)))?;

    runtime.block_on(async move {
        let server = HttpServer::with_config(config)?;
        server.start().await
    })
}

/// Run one guarded statement against the configured database file
pub fn query(config: &GatewayConfig, sql: &str, params: &[String]) -> CliResult<Value> {
    let params = params
        .iter()
        .map(|p| serde_json::from_str::<Value>(p))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::query_failed(format!("Invalid --param JSON: {}", e)))?;

    let db_path: PathBuf = config.db_path();
    let db = Database::open(&db_path).map_err(|e| {
        CliError::boot_failed(format!(
            "Failed to open database at {}: {}",
            db_path.display(),
            e
        ))
    })?;

    let service = GatewayService::new(db);
    let rows = service
        .raw_query(sql, params)
        .map_err(|e| CliError::query_failed(e.to_string()));
    service
        .close()
        .map_err(|e| CliError::io_error(format!("Failed to close database: {}", e)))?;

    Ok(Value::Array(rows?.into_iter().map(Value::Object).collect()))
}
