//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint except the event stream answers with an
//! [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },                                        // success only
//!   "error": { "code": "invalid_request", "message": "..." } // failure only
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ChatlensError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
/// Each variant maps to a fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, bad parameters or unparseable transcript. HTTP 400.
    InvalidRequest,
    /// An upstream model provider asked us to slow down. HTTP 429.
    RateLimited,
    /// An unexpected server-side error occurred. Internal details are never
    /// leaked to the client. HTTP 500.
    InternalError,
    /// The capability needed for this request is not configured. HTTP 501.
    NotImplemented,
    /// The summarization or embedding provider failed. HTTP 502.
    UpstreamError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::InternalError => write!(f, "internal_error"),
            Self::NotImplemented => write!(f, "not_implemented"),
            Self::UpstreamError => write!(f, "upstream_error"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

/// Canonical v1 API response envelope.
///
/// On success `data` is present and `error` is absent; on error the reverse.
/// The HTTP status is derived from the error code on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

/// Rejection returned by extractors before a handler runs.
pub type ApiRejection = ApiResponse<()>;

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(error) => {
                tracing::error!(%error, "Failed to serialize v1 response");
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

fn rate_limit_message(retry_after: Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!("Rate limit exceeded, retry after {secs} seconds"),
        None => "Rate limit exceeded".to_string(),
    }
}

impl<T: Serialize> From<ChatlensError> for ApiResponse<T> {
    /// Internal and upstream error details are never sent to the client; they
    /// are logged and replaced by a generic message.
    fn from(err: ChatlensError) -> Self {
        match err {
            ChatlensError::InvalidTimestamp { .. } => {
                ApiResponse::error(ErrorCode::InvalidRequest, err.to_string())
            }

            ChatlensError::Validation(ref msg) | ChatlensError::Transcript(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            ChatlensError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            ChatlensError::ApiRateLimit { retry_after }
            | ChatlensError::LlmRateLimit { retry_after } => {
                ApiResponse::error(ErrorCode::RateLimited, rate_limit_message(retry_after))
            }

            ChatlensError::LlmUnavailable(ref msg) => {
                ApiResponse::error(ErrorCode::NotImplemented, msg.clone())
            }

            ref upstream @ (ChatlensError::Llm(_)
            | ChatlensError::Embedding(_)
            | ChatlensError::ApiAuth(_)
            | ChatlensError::Http(_)) => {
                tracing::error!(error = %upstream, "Upstream error mapped to v1 response");
                ApiResponse::error(ErrorCode::UpstreamError, "Upstream model provider failed")
            }

            ref internal @ (ChatlensError::DimensionMismatch { .. }
            | ChatlensError::Io(_)
            | ChatlensError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
