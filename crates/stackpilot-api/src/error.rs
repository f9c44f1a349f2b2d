//! HTTP error mapping
//!
//! Tenant callers never learn whether an instance exists outside their
//! scope: out-of-scope and nonexistent both arrive here as
//! `DomainError::NotFound` and leave as 404.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use stackpilot_core::error::DomainError;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
            }
            ApiError::Domain(e) => {
                let message = e.to_string();
                match e {
                    DomainError::NotFound => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", message)
                    }
                    DomainError::ValidationError(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
                    }
                    DomainError::NoActiveSubscription => {
                        (StatusCode::BAD_REQUEST, "NO_ACTIVE_SUBSCRIPTION", message)
                    }
                    DomainError::QuotaExceeded { .. } => {
                        (StatusCode::BAD_REQUEST, "QUOTA_EXCEEDED", message)
                    }
                    DomainError::ModuleNotAllowed(_) => {
                        (StatusCode::BAD_REQUEST, "MODULE_NOT_ALLOWED", message)
                    }
                    DomainError::InvalidTransition { .. } => {
                        (StatusCode::CONFLICT, "INVALID_TRANSITION", message)
                    }
                    DomainError::ConflictActionInProgress => (
                        StatusCode::CONFLICT,
                        "CONFLICT_ACTION_IN_PROGRESS",
                        message,
                    ),
                    DomainError::StaleState { .. } => {
                        (StatusCode::CONFLICT, "STALE_STATE", message)
                    }
                    DomainError::ResourceExhausted(_) => {
                        tracing::error!("Resource exhausted: {}", message);
                        (StatusCode::SERVICE_UNAVAILABLE, "RESOURCE_EXHAUSTED", message)
                    }
                    DomainError::ExecutorFailure(_) => {
                        tracing::error!("Executor failure: {}", message);
                        (StatusCode::INTERNAL_SERVER_ERROR, "EXECUTOR_FAILURE", message)
                    }
                    DomainError::DatabaseError(_) => {
                        tracing::error!("Database error: {}", message);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "DATABASE_ERROR",
                            "internal error".to_string(),
                        )
                    }
                    DomainError::InternalError(_) => {
                        tracing::error!("Internal error: {}", message);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "INTERNAL_ERROR",
                            "internal error".to_string(),
                        )
                    }
                }
            }
        };

        let body = Json(ApiResponse::<()>::error(code, &message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpilot_core::domain::{InstanceState, LifecycleAction};

    #[test]
    fn test_scope_misses_map_to_not_found() {
        let response = ApiError::Domain(DomainError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflicts_map_to_409() {
        let response = ApiError::Domain(DomainError::ConflictActionInProgress).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ApiError::Domain(DomainError::InvalidTransition {
            action: LifecycleAction::Start,
            state: InstanceState::Running,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_quota_maps_to_400() {
        let response = ApiError::Domain(DomainError::QuotaExceeded { limit: 1 }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
