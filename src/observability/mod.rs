//! Observability for tablegate
//!
//! Structured JSON logging for server lifecycle and request outcomes.
//!
//! ```ignore
//! use tablegate::observability::Logger;
//!
//! Logger::info("UPLOAD_COMPLETE", &[("table", "data"), ("rows", "3")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};
