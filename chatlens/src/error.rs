use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatlensError {
    #[error("Unparseable message timestamp: date={date:?} time={time:?}")]
    InvalidTimestamp { date: String, time: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transcript error: {0}")]
    Transcript(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API rate limit exceeded, retry after {retry_after:?} seconds")]
    ApiRateLimit { retry_after: Option<u64> },

    #[error("API authentication error: {0}")]
    ApiAuth(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },
}

impl IntoResponse for ChatlensError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ChatlensError::InvalidTimestamp { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            ChatlensError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ChatlensError::Transcript(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ChatlensError::Embedding(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ChatlensError::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ChatlensError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ChatlensError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ChatlensError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ChatlensError::ApiRateLimit { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string())
            }
            ChatlensError::ApiAuth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ChatlensError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ChatlensError::Llm(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ChatlensError::LlmUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ChatlensError::LlmRateLimit { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("LLM rate limit exceeded, retry after {retry_after:?} seconds"),
            ),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ChatlensError>;
