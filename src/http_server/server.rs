//! # HTTP Server
//!
//! Owns the shared [`GatewayService`], serves the gateway routes and closes
//! the database once the server has drained.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::GatewayConfig;
use super::gateway_routes::gateway_routes;
use crate::cli::{CliError, CliResult};
use crate::database::Database;
use crate::gateway::GatewayService;
use crate::observability::Logger;

/// HTTP server for the gateway
pub struct HttpServer {
    config: GatewayConfig,
    service: Arc<GatewayService>,
    router: Router,
}

impl HttpServer {
    /// Open the database described by `config` and build the router.
    pub fn with_config(config: GatewayConfig) -> CliResult<Self> {
        let db = Database::open(&config.db_path()).map_err(|e| {
            CliError::boot_failed(format!(
                "Failed to open database at {}: {}",
                config.db_path().display(),
                e
            ))
        })?;
        Self::with_database(config, db)
    }

    /// Build the server around an already opened database.
    pub fn with_database(config: GatewayConfig, db: Database) -> CliResult<Self> {
        let service = Arc::new(GatewayService::new(db));
        if config.create_sample_table {
            service
                .create_sample_table()
                .map_err(|e| CliError::boot_failed(format!("Failed to create sample table: {}", e)))?;
        }

        let router = Self::build_router(&config, Arc::clone(&service));
        Ok(Self {
            config,
            service,
            router,
        })
    }

    fn build_router(config: &GatewayConfig, service: Arc<GatewayService>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        gateway_routes(service)
            .layer(DefaultBodyLimit::max(config.max_upload_bytes))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// The shared service
    pub fn service(&self) -> Arc<GatewayService> {
        Arc::clone(&self.service)
    }

    /// Get the router (for testing)
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until Ctrl-C or SIGTERM, then close the database.
    pub async fn start(self) -> CliResult<()> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            CliError::config_error(format!(
                "Invalid socket address '{}': {}",
                self.config.socket_addr(),
                e
            ))
        })?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info("SERVER_STARTING", &[("addr", &addr.to_string())]);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Logger::info("SERVER_STOPPED", &[]);
        self.service
            .close()
            .map_err(|e| CliError::io_error(format!("Failed to close database: {}", e)))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            Logger::error("SIGNAL_HANDLER_FAILED", &[("error", &e.to_string())]);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                Logger::error("SIGNAL_HANDLER_FAILED", &[("error", &e.to_string())]);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
