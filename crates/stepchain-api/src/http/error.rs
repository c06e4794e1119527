//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stepchain_types::error::{ChainError, InvokeError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Chain orchestration errors.
    Chain(ChainError),
    /// Generic internal error.
    Internal(String),
}

impl From<ChainError> for AppError {
    fn from(e: ChainError) -> Self {
        AppError::Chain(e)
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Chain(ChainError::NotFound(_)) => (StatusCode::NOT_FOUND, "CHAIN_NOT_FOUND"),
            AppError::Chain(ChainError::Duplicate(_)) => (StatusCode::CONFLICT, "CHAIN_EXISTS"),
            AppError::Chain(ChainError::NoMoreSteps(_)) => (StatusCode::CONFLICT, "NO_MORE_STEPS"),
            AppError::Chain(ChainError::Invoke(InvokeError::Upstream(_))) => {
                (StatusCode::BAD_GATEWAY, "WORKFLOW_ERROR")
            }
            AppError::Chain(ChainError::Invoke(_)) => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Chain(e) => e.to_string(),
            AppError::Internal(msg) => msg.clone(),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_error_status_mapping() {
        let cases = [
            (
                AppError::Chain(ChainError::NotFound("c".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Chain(ChainError::Duplicate("c".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Chain(ChainError::NoMoreSteps("c".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Chain(ChainError::Invoke(InvokeError::Upstream("boom".to_string()))),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Chain(ChainError::Invoke(InvokeError::Status {
                    status: 503,
                    body: String::new(),
                })),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Internal("oops".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected);
        }
    }
}
