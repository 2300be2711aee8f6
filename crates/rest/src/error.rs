//! Error types for the REST layer.
//!
//! Handler failures never escape as bare HTTP errors: every [`RestError`]
//! renders as a response [`Envelope`].
//!
//! | Error | Status | HTTP |
//! |-------|--------|------|
//! | InvalidParameter | `INVALID_DATA` | 400 |
//! | MalformedQuery | `INVALID_DATA` | 400 |
//! | Storage | `DATABASE_ERROR` | 500 |
//! | Internal | `STATUS_ERROR` | 500 |

use std::fmt;

use axum::extract::rejection::QueryRejection;
use axum::response::{IntoResponse, Response};
use cdm_lookup_persistence::StorageError;

use crate::extractors::ParamError;
use crate::responses::Envelope;

/// The error type for REST handlers.
#[derive(Debug)]
pub enum RestError {
    /// A query parameter could not be parsed.
    InvalidParameter(ParamError),

    /// The query string itself could not be decoded.
    MalformedQuery {
        /// Decoder message.
        message: String,
    },

    /// The storage layer failed.
    Storage(StorageError),

    /// The handler could not complete, e.g. its worker task panicked.
    Internal {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for REST handlers.
pub type RestResult<T> = Result<T, RestError>;

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::InvalidParameter(err) => write!(f, "Invalid parameter: {}", err),
            RestError::MalformedQuery { message } => write!(f, "Malformed query: {}", message),
            RestError::Storage(err) => write!(f, "Storage error: {}", err),
            RestError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let envelope = match &self {
            RestError::InvalidParameter(err) => {
                tracing::debug!(error = %err, "Rejecting request parameters");
                Envelope::invalid_data(serde_json::Value::Null)
            }
            RestError::MalformedQuery { message } => {
                tracing::debug!(message = %message, "Rejecting malformed query string");
                Envelope::invalid_data(serde_json::Value::Null)
            }
            RestError::Storage(err) => {
                tracing::error!(error = %err, "Database error while handling request");
                Envelope::database_error()
            }
            RestError::Internal { message } => {
                tracing::error!(message = %message, "Internal error while handling request");
                Envelope::status_error()
            }
        };
        envelope.into_response()
    }
}

impl From<ParamError> for RestError {
    fn from(err: ParamError) -> Self {
        RestError::InvalidParameter(err)
    }
}

impl From<QueryRejection> for RestError {
    fn from(rejection: QueryRejection) -> Self {
        RestError::MalformedQuery {
            message: rejection.body_text(),
        }
    }
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        RestError::Storage(err)
    }
}

impl From<tokio::task::JoinError> for RestError {
    fn from(err: tokio::task::JoinError) -> Self {
        RestError::Internal {
            message: err.to_string(),
        }
    }
}
