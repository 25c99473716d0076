//! # Gateway
//!
//! Translates untrusted request input into safe database operations:
//! identifier validation, parameterized SQL construction, upload format
//! detection and decoding, and error classification.

mod errors;
mod identifier;
mod service;
pub mod sql;
mod upload;

pub use errors::{ErrorResponse, GatewayError, GatewayResult};
pub use identifier::{is_valid_identifier, validate_identifier};
pub use service::{GatewayService, Health, SAMPLE_TABLE};
pub use upload::{UploadFormat, UploadedFile};
