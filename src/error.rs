use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::{InvocationError, RecommendError};

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Recommend(#[from] RecommendError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Recommend(err) => match err {
                RecommendError::Precondition(_) => StatusCode::BAD_REQUEST,
                RecommendError::Invocation(InvocationError::Timeout { .. }) => {
                    StatusCode::GATEWAY_TIMEOUT
                }
                RecommendError::Invocation(InvocationError::Transient { .. }) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                RecommendError::Invocation(InvocationError::Permanent { .. })
                | RecommendError::Parse(_)
                | RecommendError::Validation(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
