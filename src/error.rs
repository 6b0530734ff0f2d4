use crate::repositories::RepositoryError;
use crate::services::{FieldErrors, UserServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

pub const NOT_FOUND_DETAIL: &str = "Not found.";
pub const INVALID_PAGE_DETAIL: &str = "Invalid page.";
pub const SERVER_ERROR_DETAIL: &str = "A server error occurred.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Not found")]
    NotFound,

    #[error("Invalid page")]
    InvalidPage,

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Unsupported media type {0:?}")]
    UnsupportedMediaType(String),
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(errors) => AppError::Validation(errors),
            UserServiceError::UserNotFound => AppError::NotFound,
            UserServiceError::RepositoryError(RepositoryError::NotFound) => AppError::NotFound,
            UserServiceError::RepositoryError(RepositoryError::Database(e)) => {
                AppError::Database(e)
            }
            UserServiceError::RepositoryError(e) => AppError::Repository(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            AppError::NotFound => (StatusCode::NOT_FOUND, json!({ "detail": NOT_FOUND_DETAIL })),
            AppError::InvalidPage => (
                StatusCode::NOT_FOUND,
                json!({ "detail": INVALID_PAGE_DETAIL }),
            ),
            AppError::MalformedBody(reason) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": format!("JSON parse error - {}", reason) }),
            ),
            AppError::UnsupportedMediaType(media_type) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                json!({ "detail": format!("Unsupported media type \"{}\" in request.", media_type) }),
            ),
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "database error");
                server_error()
            }
            AppError::Repository(ref e) => {
                tracing::error!(error = %e, "repository error");
                server_error()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn server_error() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "detail": SERVER_ERROR_DETAIL }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::UniqueField;

    #[test]
    fn service_errors_map_to_http_errors() {
        assert!(matches!(
            AppError::from(UserServiceError::UserNotFound),
            AppError::NotFound
        ));
        assert!(matches!(
            AppError::from(UserServiceError::Validation(FieldErrors::new())),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(UserServiceError::RepositoryError(
                RepositoryError::Conflict(UniqueField::Email)
            )),
            AppError::Repository(_)
        ));
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::InvalidPage, StatusCode::NOT_FOUND),
            (
                AppError::Validation(FieldErrors::single("email", "bad")),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::MalformedBody("eof".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::UnsupportedMediaType("text/plain".to_string()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
