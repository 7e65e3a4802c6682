// [libs/cache-core/src/error.rs]
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    UpstreamUnavailable(String),

    #[error("CONFLICT: {0}")]
    Conflict(String),

    #[error("VERIFICATION_FAILED: {0}")]
    VerificationFailed(String),

    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            CacheError::Conflict(_) => StatusCode::CONFLICT,
            CacheError::VerificationFailed(_) => StatusCode::OK,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self, "cache manager error");
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
