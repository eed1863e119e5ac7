// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::services::error::MEMBER_LINKED_TO_ACCOUNT;
use crate::services::ServiceError;

/// Where clients are sent when the principal has no family yet
pub const ONBOARDING_PATH: &str = "/onboarding";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    OnboardingRequired,

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::OnboardingRequired => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::OnboardingRequired => "Family setup required",
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::OnboardingRequired => "ONBOARDING_REQUIRED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError { field_errors: Some(field_errors), .. } => {
                body["field_errors"] = json!(field_errors);
            }
            ApiError::OnboardingRequired => {
                body["redirect"] = json!(ONBOARDING_PATH);
            }
            _ => {}
        }

        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// Map a service failure onto the wire. Expected failures keep their
    /// message; anything unexpected is logged and replaced by `fallback`.
    pub fn from_service(err: ServiceError, fallback: &str) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::validation_error(msg, None),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::MemberLinkedToAccount => ApiError::conflict(MEMBER_LINKED_TO_ACCOUNT),
            ServiceError::OnboardingRequired => ApiError::OnboardingRequired,
            ServiceError::Unavailable(source) => {
                tracing::warn!("{}: storage unavailable: {}", fallback, source);
                ApiError::service_unavailable(fallback)
            }
            ServiceError::Store(source) => {
                tracing::error!("{}: {}", fallback, source);
                ApiError::internal_server_error(fallback)
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::from_service(err, "An error occurred while processing your request")
    }
}

/// Attach an operation's generic failure message to a service result
pub trait OrFail<T> {
    fn or_fail(self, fallback: &str) -> Result<T, ApiError>;
}

impl<T> OrFail<T> for Result<T, ServiceError> {
    fn or_fail(self, fallback: &str) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::from_service(err, fallback))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::StoreError;

    #[test]
    fn onboarding_body_carries_redirect() {
        let body = ApiError::OnboardingRequired.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "ONBOARDING_REQUIRED");
        assert_eq!(body["redirect"], "/onboarding");
        assert_eq!(ApiError::OnboardingRequired.status_code(), 403);
    }

    #[test]
    fn unexpected_failures_use_the_operation_message() {
        let err = ApiError::from_service(
            ServiceError::Store(StoreError::Simulated("disk on fire".into())),
            "Failed to create family",
        );
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Failed to create family");
    }

    #[test]
    fn linked_member_maps_to_conflict_with_guidance() {
        let err = ApiError::from(ServiceError::MemberLinkedToAccount);
        assert_eq!(err.status_code(), 409);
        assert!(err.message().starts_with("Cannot delete a family member linked to a user account"));
    }
}
