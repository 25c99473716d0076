//! # HTTP Server Module
//!
//! Axum server exposing the gateway.
//!
//! # Endpoints
//!
//! - `GET /` - Health check
//! - `POST /create_table/` - Create a table from a column spec
//! - `POST /insert/` - Insert one JSON row
//! - `GET /query/` - Run a query or read a whole table
//! - `POST /raw_query/` - Parameterized SQL, `DROP` refused
//! - `POST /upload/` - Bulk load a CSV or Parquet file

pub mod config;
pub mod gateway_routes;
pub mod server;

pub use config::GatewayConfig;
pub use server::HttpServer;
