//! JSON response envelope.
//!
//! Every endpoint answers with `{ "status": <STATUS>, "data": <payload> }`.
//! The status is drawn from a closed set and determines the HTTP status code.
//!
//! | Status | HTTP |
//! |--------|------|
//! | `SUCCESS` | 200 |
//! | `INVALID_DATA` | 400 |
//! | `DATABASE_ERROR` | 500 |
//! | `STATUS_ERROR` | 500 |

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome classification of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    /// The operation succeeded.
    Success,
    /// The client supplied a value outside the accepted set.
    InvalidData,
    /// The storage layer failed.
    DatabaseError,
    /// Fallback for an unrecognized status.
    StatusError,
}

impl ResponseStatus {
    /// Parses a status string, ignoring case.
    pub fn parse(status: &str) -> Option<Self> {
        match status.to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(ResponseStatus::Success),
            "INVALID_DATA" => Some(ResponseStatus::InvalidData),
            "DATABASE_ERROR" => Some(ResponseStatus::DatabaseError),
            "STATUS_ERROR" => Some(ResponseStatus::StatusError),
            _ => None,
        }
    }

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "SUCCESS",
            ResponseStatus::InvalidData => "INVALID_DATA",
            ResponseStatus::DatabaseError => "DATABASE_ERROR",
            ResponseStatus::StatusError => "STATUS_ERROR",
        }
    }

    /// Returns the HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResponseStatus::Success => StatusCode::OK,
            ResponseStatus::InvalidData => StatusCode::BAD_REQUEST,
            ResponseStatus::DatabaseError | ResponseStatus::StatusError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    status: ResponseStatus,
    data: Value,
}

impl Envelope {
    /// Creates an envelope.
    pub fn new(status: ResponseStatus, data: Value) -> Self {
        Self { status, data }
    }

    /// Builds an envelope from a status string.
    ///
    /// An unrecognized status becomes `STATUS_ERROR` with a null payload.
    pub fn from_status_str(status: &str, data: Value) -> Self {
        match ResponseStatus::parse(status) {
            Some(status) => Self::new(status, data),
            None => {
                tracing::warn!(status, "Unrecognized response status");
                Self::status_error()
            }
        }
    }

    /// Successful payload.
    pub fn success(data: Value) -> Self {
        Self::new(ResponseStatus::Success, data)
    }

    /// Successful payload of the form `{ key: value }`.
    pub fn keyed<T: Serialize>(key: &str, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                let mut data = Map::new();
                data.insert(key.to_string(), value);
                Self::success(Value::Object(data))
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize response payload");
                Self::status_error()
            }
        }
    }

    /// Rejected input; `data` lists what would have been accepted, or is null.
    pub fn invalid_data(data: Value) -> Self {
        Self::new(ResponseStatus::InvalidData, data)
    }

    /// Storage failure; `data` is null.
    pub fn database_error() -> Self {
        Self::new(ResponseStatus::DatabaseError, Value::Null)
    }

    /// Any other failure; `data` is null.
    pub fn status_error() -> Self {
        Self::new(ResponseStatus::StatusError, Value::Null)
    }

    /// Returns the status.
    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    /// Returns the payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the HTTP status code for the status.
    pub fn status_code(&self) -> StatusCode {
        self.status.status_code()
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
