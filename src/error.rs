//! Error types and handling for the gateway.
//!
//! Errors carry a kind that decides their HTTP status. Every `Error` converts into a
//! JSON response of the shape:
//!
//! ```json
//! { "error": "Internal Server Error", "message": "connection refused" }
//! ```
//!
//! # Design
//!
//! This module uses an opaque `Error` struct paired with an `ErrorKind` enum,
//! following the `std::io::Error` pattern. Responses built from an `Error` also carry
//! an [`ErrorReport`] extension so that the global error handler of the pipeline can
//! log server-side failures and redact their message in production.
//!
//! # Example
//!
//! ```rust
//! use talent_quotient_api::{Error, ErrorKind};
//! use axum::http::StatusCode;
//!
//! let error = Error::invalid_input("Malformed JSON body");
//! assert_eq!(error.kind(), ErrorKind::InvalidInput);
//! assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::Environment;

/// Message sent to clients in place of server-side error details in production.
pub const REDACTED_MESSAGE: &str = "Something went wrong";

/// The kind of error that occurred.
///
/// This enum is marked `#[non_exhaustive]`, so new variants may be added
/// without breaking existing code. Always include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Data store error (connection, query, pool issues).
    #[error("database error")]
    Database,

    /// Authentication error.
    #[error("authentication error")]
    Authentication,

    /// Configuration error (invalid TOML, missing values).
    #[error("configuration error")]
    Configuration,

    /// I/O error (file operations, network).
    #[error("I/O error")]
    Io,

    /// Invalid input (bad URL, header, request data).
    #[error("invalid input")]
    InvalidInput,

    /// The request body exceeds the configured limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// The request's `Origin` is not on the allow-list.
    #[error("origin not allowed")]
    OriginNotAllowed,

    /// Internal/unexpected error.
    #[error("internal error")]
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind of error.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Database => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::OriginNotAllowed => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error that can occur in the gateway.
///
/// Use [`Error::kind()`] to determine the category of error for matching,
/// and the `Display` implementation to get a human-readable message.
///
/// ```rust
/// use talent_quotient_api::{Error, ErrorKind};
///
/// let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
/// let err = Error::new(ErrorKind::Io, io_err);
/// assert_eq!(err.kind(), ErrorKind::Io);
/// ```
pub struct Error {
    kind: ErrorKind,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl Error {
    /// Creates a new error with the given kind and source.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind,
            source: error.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Converts the error into a structured error response.
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::from_status(self.status_code(), self.to_string())
    }

    /// Consumes the error and returns the inner error source.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.source
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl Error {
    /// Creates a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, msg.into())
    }

    /// Creates a database configuration error.
    ///
    /// This is a `Configuration` kind error with a "Database configuration error" prefix.
    pub fn database_config(msg: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Configuration,
            format!("Database configuration error: {}", msg.into()),
        )
    }

    /// Creates an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, msg.into())
    }

    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, msg.into())
    }

    /// Creates an I/O error from a message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, msg.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, msg.into())
    }

    /// Creates a payload too large error.
    pub fn payload_too_large(limit: u64) -> Self {
        Self::new(
            ErrorKind::PayloadTooLarge,
            format!("Request body exceeds the limit of {limit} bytes"),
        )
    }

    /// Creates the error returned when the CORS admission check rejects an origin.
    pub fn origin_not_allowed() -> Self {
        Self::new(ErrorKind::OriginNotAllowed, "Not allowed by CORS")
    }

    /// Creates an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg.into())
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let report = ErrorReport::from(&self);
        let mut response = (report.status, Json(self.to_error_response())).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

// ============================================================================
// From implementations
// ============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::new(ErrorKind::Configuration, err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::new(ErrorKind::InvalidInput, err)
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Self::new(ErrorKind::Configuration, err)
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::new(ErrorKind::InvalidInput, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidInput, err)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::new(ErrorKind::Authentication, err)
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::new(ErrorKind::Database, err)
    }
}

// ============================================================================
// ErrorResponse
// ============================================================================

/// JSON body of every error produced by the gateway.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Canonical reason phrase of the status, e.g. `"Internal Server Error"`.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Creates an error response whose `error` field is the reason phrase of `status`.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status.canonical_reason().unwrap_or("Error"), message)
    }

    /// Creates the body of a 500 response.
    /// The raw message is only disclosed outside of production.
    pub fn server_error(message: &str, environment: Environment) -> Self {
        let message = if environment.is_production() {
            REDACTED_MESSAGE
        } else {
            message
        };
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

// ============================================================================
// ErrorReport
// ============================================================================

/// Response extension describing the error a response was built from.
///
/// The global error handler looks for this extension to tell failures apart from
/// ordinary responses that merely carry an error status.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
}

impl ErrorReport {
    /// True when the report describes a failure on the server side.
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
