use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use common::Error;

/// Failure of a route, rendered as `500 {message, error}`.
#[derive(Debug)]
pub struct ApiError {
    message: &'static str,
    error: Error,
}

impl ApiError {
    pub fn new(message: &'static str, error: Error) -> Self {
        Self { message, error }
    }

    /// A request body that could not be read as the route's schema.
    pub fn rejected(message: &'static str, rejection: JsonRejection) -> Self {
        Self::new(message, Error::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(message = self.message, error = %self.error, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "message": self.message,
                "error": self.error.to_string(),
            })),
        )
            .into_response()
    }
}
