//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes construction of failure envelopes so every rejection has the
//! same `{success: false, message, error}` shape.
//!
//! # Key invariants and assumptions
//! - `success` is always `false` in an error body.
//! - Status codes follow the category: 400 validation, 401 unauthenticated,
//!   403 forbidden, 409 conflict, 500 internal.
//!
//! # Security considerations
//! - Internal errors are logged server-side and answered with a generic
//!   message.
//! - Authentication failures never say which check failed.
use crate::api::types::ErrorResponse;
use crate::images::ImageError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use marketplace::api::error::api_forbidden;
///
/// let err = api_forbidden("only admins can perform this action");
/// assert_eq!(err.status, StatusCode::FORBIDDEN);
/// assert!(!err.body.success);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            success: false,
            message: message.to_string(),
            error: Some(code.to_string()),
        },
    }
}

/// Build the uniform 401 returned for every authentication failure.
pub fn api_unauthenticated() -> ApiError {
    error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "authentication required",
    )
}

/// Login failure; does not reveal whether the email exists.
pub fn api_invalid_credentials() -> ApiError {
    error(
        StatusCode::UNAUTHORIZED,
        "invalid_credentials",
        "email or password is incorrect",
    )
}

pub fn api_forbidden(message: &str) -> ApiError {
    error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_conflict(message: &str) -> ApiError {
    error(StatusCode::CONFLICT, "conflict", message)
}

/// Build a 500 from a store error.
///
/// Logs the store error and returns a generic message. Conflicts raised by
/// the store are still reported as 409.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    if let StoreError::Conflict(detail) = err {
        return api_conflict(detail);
    }
    tracing::error!(error = ?err, "marketplace storage error");
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 500 without a store error.
pub fn api_internal_message(message: &str) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Map an image-store failure: bad payloads are the caller's fault.
pub fn api_image_error(message: &str, err: &ImageError) -> ApiError {
    match err {
        ImageError::InvalidEncoding | ImageError::Empty | ImageError::InvalidKey(_) => {
            api_validation_error(&format!("{message}: {err}"))
        }
        ImageError::NotFound(_) | ImageError::Io(_) => {
            tracing::error!(error = ?err, "image store error");
            error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
        }
    }
}
