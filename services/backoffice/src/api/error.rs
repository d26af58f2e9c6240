//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every back-office endpoint
//! returns the same `{ success: false, code, message }` shape, and translates
//! store failures into status codes.
//!
//! # Key invariants and assumptions
//! - Error responses must include a stable `code` and human-readable `message`.
//! - Status codes must align with the error category.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use backoffice::api::error::ApiError;
/// use backoffice::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         success: false,
///         code: "not_found".to_string(),
///         message: "missing".to_string(),
///         request_id: None,
///     },
/// };
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

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            success: false,
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 404 Not Found error with code `not_found`.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error.
///
/// The caller provides a specific conflict code for precise client handling.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 500 Internal Server Error from a store error.
///
/// # What it does
/// Logs the store error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "backoffice storage error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 503 Service Unavailable error for a resource that cannot be
/// issued right now, such as a day whose business keys are used up.
pub fn api_unavailable(code: &str, message: &str) -> ApiError {
    tracing::warn!(code, message, "backoffice request refused");
    api_error(StatusCode::SERVICE_UNAVAILABLE, code, message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Map an axum JSON extractor rejection (malformed body, wrong content type)
/// onto a 400 validation error.
pub fn api_json_rejection(rejection: JsonRejection) -> ApiError {
    api_validation_error(&rejection.body_text())
}

/// Translate a store error raised by a create, patch, or delete.
///
/// Not-found messages carry the store's detail, which names the identifier
/// (`"role ROLE-20261016-0042 not found"`). `entity` and `action` phrase the
/// generic 500 message.
pub fn api_store_error(entity: &str, action: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(detail) => api_not_found(&format!("{detail} not found")),
        StoreError::Conflict(detail) => api_conflict("conflict", &detail),
        StoreError::Exhausted(exhausted) => {
            api_unavailable("sequence_exhausted", &exhausted.to_string())
        }
        err @ StoreError::Unexpected(_) => api_internal(&format!("failed to {action} {entity}"), &err),
    }
}
