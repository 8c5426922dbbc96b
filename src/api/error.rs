//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::household::HouseholdError;
use crate::planner::PlannerError;
use crate::storage::StorageError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// No session, or the credential was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session may not open this household
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Nothing in the hat can be drawn
    #[error("{0}")]
    NoEligibleMeals(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (store shut down)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::NoEligibleMeals(_) => ApiError::NoEligibleMeals(err.to_string()),
            PlannerError::InvalidRange { .. }
            | PlannerError::InvalidQuantity(_)
            | PlannerError::Invalid { .. } => ApiError::Validation(err.to_string()),
            PlannerError::Export(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<HouseholdError> for ApiError {
    fn from(err: HouseholdError) -> Self {
        match err {
            HouseholdError::InvalidKey { .. } => ApiError::Validation(err.to_string()),
            HouseholdError::HatNotFound(_) | HouseholdError::NotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            HouseholdError::HatExists(_) => ApiError::Conflict(err.to_string()),
            HouseholdError::Closed => ApiError::Unauthorized(err.to_string()),
            HouseholdError::Planner(e) => e.into(),
            HouseholdError::Storage(StorageError::InvalidPath { path, reason }) => {
                ApiError::Validation(format!("Invalid id '{}': {}", path, reason))
            }
            HouseholdError::Storage(StorageError::ShutDown) => {
                ApiError::ServiceUnavailable(StorageError::ShutDown.to_string())
            }
            HouseholdError::Storage(e) => ApiError::Storage(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredential(_)
            | AuthError::AudienceMismatch(_)
            | AuthError::UnverifiedEmail(_)
            | AuthError::AccountMismatch { .. }
            | AuthError::LoginRequired => ApiError::Unauthorized(err.to_string()),
            AuthError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            AuthError::Household(e) => e.into(),
            AuthError::Storage(e) => HouseholdError::Storage(e).into(),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "LOGIN_REQUIRED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::NoEligibleMeals(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_ELIGIBLE_MEALS")
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        let date = "2024-03-01".parse().unwrap();
        assert_eq!(
            status(PlannerError::NoEligibleMeals(date)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status(PlannerError::InvalidQuantity(-1.0)), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::LoginRequired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AuthError::AccountMismatch {
                claimed: "a@b.com".to_string(),
                verified: "c@d.com".to_string(),
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthError::Storage(StorageError::ShutDown)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(AuthError::Forbidden("cabin".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(HouseholdError::HatExists("cabin".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(HouseholdError::not_found("Meal", "m1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(AuthError::Household(HouseholdError::Planner(
                PlannerError::NoEligibleMeals(date)
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(HouseholdError::Storage(StorageError::ShutDown)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
