//! tablegate - a minimal HTTP gateway over an embedded SQL database
//!
//! Creates tables, inserts JSON rows, runs parameterized queries and
//! bulk-loads CSV/Parquet uploads, with identifier validation as the trust
//! boundary for everything spliced into SQL text.

pub mod cli;
pub mod database;
pub mod gateway;
pub mod http_server;
pub mod observability;
