use axum::{http::StatusCode,response::{IntoResponse,Response},Json};

use axum::extract::multipart::MultipartError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug,Error)]
pub enum AppError {

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] opendal::Error),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Validation(format!("malformed multipart body: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

// error --> HTTP mapping

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(msg) => {
                tracing::warn!(message = %msg, "Validation failed");
                StatusCode::BAD_REQUEST
            },
            AppError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflicting request");
                StatusCode::BAD_REQUEST
            },
            AppError::NotFound(msg) => {
                tracing::info!(message = %msg, "Resource not found");
                StatusCode::NOT_FOUND
            },
            AppError::Storage(_) | AppError::Db(_) | AppError::Other(_) => {
                error!(error = ?self, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_boundary_status_codes() {
        let cases = [
            (AppError::not_found("vehicle"), StatusCode::NOT_FOUND),
            (AppError::validation("trip_type is required"), StatusCode::BAD_REQUEST),
            (AppError::conflict("vehicle already assigned"), StatusCode::BAD_REQUEST),
            (
                AppError::Other(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
