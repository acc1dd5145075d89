use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.as_str()),
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::QuotaExceeded(ref msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.as_str()),
            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error")
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                AppError::Auth("denied".to_string()).into_response(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Validation("bad".to_string()).into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::QuotaExceeded("full".to_string()).into_response(),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::Storage("disk".to_string()).into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::NotFound.into_response(), StatusCode::NOT_FOUND),
        ];

        for (response, status) in cases {
            assert_eq!(response.status(), status);
        }
    }
}
