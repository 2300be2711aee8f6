//! Handler for paths no route matches.

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::responses::Envelope;

/// Answers `404 Not Found` with a `STATUS_ERROR` envelope.
pub async fn not_found_handler(uri: Uri) -> Response {
    debug!(path = %uri.path(), "No route for request");
    (StatusCode::NOT_FOUND, Envelope::status_error()).into_response()
}
