//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::RewardsError;

/// Application-level error type for the loyalty server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rewards operation failed.
    #[error(transparent)]
    Rewards(#[from] RewardsError),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Rewards(err) => match err {
                RewardsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                RewardsError::NotFound(_) => StatusCode::NOT_FOUND,
                RewardsError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
                RewardsError::Conflict(_) => StatusCode::CONFLICT,
                RewardsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Rewards(RewardsError::Storage(_)))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use crate::db::RepositoryError;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::from(RewardsError::NotFound("merchant"));
        assert_eq!(err.to_string(), "not found: merchant");

        let err = AppError::Unauthorized("missing caller identity".to_string());
        assert_eq!(err.to_string(), "Unauthorized: missing caller identity");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(RewardsError::InvalidInput("abc".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RewardsError::NotFound("ledger entry").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RewardsError::PreconditionFailed("no tiers configured").into()),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            get_status(RewardsError::Conflict("exists".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RewardsError::Storage(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }
}
