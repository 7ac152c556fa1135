/*
 * Responsibility
 * - Request-level error taxonomy (AppError)
 * - IntoResponse: 401 without body, 400/413/500 with the underlying message as text/plain
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Storage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            AppError::MalformedRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            AppError::PayloadTooLarge(message) => {
                (StatusCode::PAYLOAD_TOO_LARGE, message).into_response()
            }
            AppError::Storage(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
            AppError::Config(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            )
                .into_response(),
        }
    }
}
