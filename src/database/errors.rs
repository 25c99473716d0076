//! # Database Errors

use arrow::error::ArrowError;
use thiserror::Error;

/// Result type for database operations
pub type DbResult<T> = Result<T, DatabaseError>;

/// Failures surfaced by the embedded engine or while moving data into it.
///
/// Display output is the underlying message, unmodified, so it can be
/// passed straight through to clients.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Engine-level failure (syntax, unknown table, conversion, constraint, ...)
    #[error("{0}")]
    Engine(#[from] duckdb::Error),

    /// Failure preparing the database file or its directory
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Failure converting columns on their way in or out of the engine
    #[error("{0}")]
    Arrow(#[from] ArrowError),

    /// Result rows that could not be re-read as JSON objects
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// Column type the loader cannot stage
    #[error("unsupported column type for '{column}': {data_type}")]
    UnsupportedColumn { column: String, data_type: String },

    /// More than one statement in a single request
    #[error("multiple statements are not supported; send one statement per request")]
    MultipleStatements,

    /// The connection was closed at shutdown
    #[error("database connection is closed")]
    Closed,
}
