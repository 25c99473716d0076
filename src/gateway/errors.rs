//! # Gateway Errors
//!
//! Every failure a gateway operation can report, and its HTTP mapping.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::database::{DatabaseError, NotScalar};
use crate::observability::Logger;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Missing or malformed input
    #[error("{0}")]
    BadRequest(String),

    /// A table or column name failed the identifier grammar
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Statement matched the raw query denylist
    #[error("{0}")]
    Forbidden(String),

    /// Request body over the configured upload limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Upload file name has no recognized suffix
    #[error("Unsupported file type. Use CSV or Parquet.")]
    UnsupportedFormat,

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Any failure surfaced by the engine, message verbatim
    #[error("{0}")]
    Database(String),

    /// The uploaded file could not be decoded
    #[error("{0}")]
    Parse(String),

    /// Unclassified failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_)
            | GatewayError::InvalidIdentifier(_)
            | GatewayError::UnsupportedFormat => StatusCode::BAD_REQUEST,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Database(_) | GatewayError::Parse(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DatabaseError> for GatewayError {
    fn from(err: DatabaseError) -> Self {
        GatewayError::Database(err.to_string())
    }
}

impl From<NotScalar> for GatewayError {
    fn from(err: NotScalar) -> Self {
        GatewayError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        GatewayError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for GatewayError {
    fn from(rejection: MultipartRejection) -> Self {
        GatewayError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for GatewayError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => GatewayError::PayloadTooLarge(err.body_text()),
            _ => GatewayError::BadRequest(err.body_text()),
        }
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        GatewayError::Internal(err.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let code = status.as_u16().to_string();
        let fields = [("status", code.as_str()), ("detail", detail.as_str())];
        if status.is_server_error() {
            Logger::error("REQUEST_FAILED", &fields);
        } else {
            Logger::warn("REQUEST_REJECTED", &fields);
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
