use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bizsite_core::content::{AgentError, ModelError};
use serde_json::json;

use crate::google::GoogleError;

/// API error type rendered as `{"error": {"type", "message", "statusCode"}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A provider we call (LLM, Google) failed or answered nonsense.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::MissingInput => ApiError::BadRequest(err.to_string()),
            AgentError::Model {
                source: ModelError::RateLimited(msg),
                ..
            } => ApiError::RateLimited(msg),
            AgentError::Model { .. } | AgentError::InvalidOutput { .. } => {
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

impl From<GoogleError> for ApiError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Rejected { status: 400, .. } => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Upstream(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            ApiError::RateLimited(msg) => {
                (StatusCode::TOO_MANY_REQUESTS, "rateLimited", msg.clone())
            }
            ApiError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "upstreamError", msg.clone())
            }
            ApiError::NotConfigured(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "notConfigured",
                format!("{what} is not configured"),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
