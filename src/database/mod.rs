//! # Database
//!
//! Owner of the embedded DuckDB connection. Everything the gateway does to
//! the engine goes through [`Database::execute`], [`Database::query`] or
//! [`Database::bulk_load`].

mod connection;
mod dataset;
mod errors;
mod statement;
mod value;

pub use connection::Database;
pub use dataset::Dataset;
pub use errors::{DatabaseError, DbResult};
pub use statement::skip_leading_trivia;
pub use value::{NotScalar, Row, RowSet, ScalarValue};
