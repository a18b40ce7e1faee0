//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>` so any [`ac_core::Error`] can be
//! propagated with `?` and still produce a JSON error body.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: ac_core::Error,
    status: StatusCode,
}

impl AppError {
    pub fn new(inner: ac_core::Error) -> Self {
        let status =
            StatusCode::from_u16(inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { inner, status }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ac_core::Error> for AppError {
    fn from(e: ac_core::Error) -> Self {
        Self::new(e)
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        Self::new(ac_core::Error::Validation(format!("invalid multipart body: {}", e.body_text())))
            .with_status(status)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                error = %self.inner,
                "conversion request failed"
            );
        } else {
            tracing::debug!(status = %self.status, error = %self.inner, "rejected request");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.inner.code(),
        });

        (self.status, axum::Json(body)).into_response()
    }
}
