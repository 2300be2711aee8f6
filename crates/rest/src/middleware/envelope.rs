//! Envelope enforcement for framework-generated errors.
//!
//! Handlers always answer with an [`Envelope`], but some responses never reach
//! a handler: the timeout layer answers `408` and the router answers `405` for
//! a known path with the wrong method. Both come back with an empty body.

use axum::{
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::responses::Envelope;

/// Middleware that replaces bare `404`, `405` and `408` responses with a
/// `STATUS_ERROR` envelope, keeping the HTTP status.
///
/// Use with `axum::middleware::from_fn`.
pub async fn envelope_bare_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !is_framework_error(status) || has_json_body(&response) {
        return response;
    }

    debug!(status = %status, "Wrapping bare error response");
    (status, Envelope::status_error()).into_response()
}

fn is_framework_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::REQUEST_TIMEOUT
    )
}

fn has_json_body(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware, routing::get};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    fn server() -> TestServer {
        let app = Router::new()
            .route("/slow", get(|| async { StatusCode::REQUEST_TIMEOUT }))
            .route(
                "/enveloped",
                get(|| async { (StatusCode::NOT_FOUND, Envelope::status_error()) }),
            )
            .route("/ok", get(|| async { "plain" }))
            .layer(middleware::from_fn(envelope_bare_errors));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_bare_timeout_is_enveloped() {
        let response = server().get("/slow").await;

        response.assert_status(StatusCode::REQUEST_TIMEOUT);
        let body: Value = response.json();
        assert_eq!(body, json!({ "status": "STATUS_ERROR", "data": null }));
    }

    #[tokio::test]
    async fn test_json_error_passes_through() {
        let response = server().get("/enveloped").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["status"], "STATUS_ERROR");
    }

    #[tokio::test]
    async fn test_success_is_untouched() {
        let response = server().get("/ok").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "plain");
    }
}
