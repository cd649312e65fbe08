use axum::{http::StatusCode, response::Json};
use pizzeria_restaurant_service::RepositoryError;

use crate::models::{ApiErrorResponse, ValidationErrorResponse};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid request: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound { entity, .. } => {
                ApiError::NotFound(format!("{entity} not found"))
            }
            RepositoryError::Validation(errors) => ApiError::Validation(errors),
            RepositoryError::Constraint(message) => ApiError::Validation(vec![message]),
            RepositoryError::Database(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationErrorResponse { errors }),
            )
                .into_response(),
            ApiError::NotFound(error) => {
                (StatusCode::NOT_FOUND, Json(ApiErrorResponse { error })).into_response()
            }
            ApiError::ServiceUnavailable(error) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiErrorResponse { error }),
            )
                .into_response(),
            ApiError::InternalError(error) => {
                tracing::error!(%error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiErrorResponse { error }),
                )
                    .into_response()
            }
        }
    }
}
