use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No books matched the request")]
    NoBooksFound,

    #[error("Catalog retrieval timed out")]
    RetrievalTimeout,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "STORAGE_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::HttpClient(_) => "UPSTREAM_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::NoBooksFound => "NO_BOOKS_FOUND",
            AppError::RetrievalTimeout => "RETRIEVAL_TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::NoBooksFound => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::HttpClient(_)
            | AppError::RetrievalTimeout
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Failures still carry a renderable result shape so the client can
        // show an empty page plus the error, unconditionally.
        let body = Json(json!({
            "books": [],
            "total": 0,
            "hasMore": false,
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NoBooksFound.code(), "NO_BOOKS_FOUND");
        assert_eq!(AppError::RetrievalTimeout.code(), "RETRIEVAL_TIMEOUT");
        assert_eq!(AppError::InvalidInput("x".to_string()).code(), "INVALID_INPUT");
        assert_eq!(AppError::NotFound("x".to_string()).code(), "NOT_FOUND");
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(
            AppError::InvalidInput("missing message".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NoBooksFound.status(), StatusCode::NOT_FOUND);
        // A timeout that survived the whole ladder is an upstream fault.
        assert_eq!(
            AppError::RetrievalTimeout.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
