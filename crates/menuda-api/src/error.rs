//! Error types for menuda-api
//!
//! Write routes are driven by HTMX, which only swaps 2xx responses. Failures
//! therefore answer `200 OK` with a toast fragment retargeted into `#toast`,
//! and a missing profile answers with `HX-Redirect: /login`.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use menuda_core::{CoreError, ErrorContext, ErrorLogger};
use menuda_core::error::DefaultErrorLogger;

use crate::{hx_redirect, toast_html};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    /// Operation failure shown as `"{prefix}{error}"`
    #[error("{prefix}{error}")]
    Operation { prefix: &'static str, error: CoreError },
}

impl ApiError {
    /// Wrap a core error with the toast prefix of the failed operation
    pub fn operation(prefix: &'static str, error: CoreError) -> Self {
        match error {
            CoreError::Unauthorized => ApiError::Unauthorized,
            error => ApiError::Operation { prefix, error },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }

    /// Text shown in the toast
    pub fn toast_message(&self) -> String {
        match self {
            ApiError::Operation { prefix, error } => format!("{}{}", prefix, error.user_message()),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        let logger = DefaultErrorLogger;
        match self {
            ApiError::Operation { prefix, error } => {
                logger.log_error(error, &ErrorContext::new(prefix.trim_end_matches(": ")));
            }
            ApiError::Unauthorized => log::debug!("No signed-in profile, redirecting to /login"),
            ApiError::BadRequest { message } => log::warn!(target: "menuda::error", "Bad request: {}", message),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        ApiError::operation("Error: ", error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        if let ApiError::Unauthorized = self {
            return hx_redirect("/login");
        }

        let mut response = (StatusCode::OK, toast_html(&self.toast_message(), true)).into_response();
        let headers = response.headers_mut();
        headers.insert("HX-Retarget", HeaderValue::from_static("#toast"));
        headers.insert("HX-Reswap", HeaderValue::from_static("beforeend"));
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_prefix() {
        let err = ApiError::operation(
            "Error deleting transaction: ",
            CoreError::Backend { message: "Transaction not found".to_string() },
        );
        assert_eq!(err.toast_message(), "Error deleting transaction: Transaction not found");
    }

    #[test]
    fn test_unauthorized_becomes_login_redirect() {
        let err = ApiError::operation("Error: ", CoreError::Unauthorized);
        assert!(matches!(err, ApiError::Unauthorized));
        let response = err.into_response();
        assert_eq!(response.headers()["HX-Redirect"], "/login");
    }

    #[test]
    fn test_failure_retargets_toast() {
        let response = ApiError::from(CoreError::validation("Title is required")).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["HX-Retarget"], "#toast");
    }
}
