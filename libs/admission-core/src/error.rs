// [libs/admission-core/src/error.rs]
//! Catalogo de fallos del nucleo de admision.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    #[error("POLICY_ENGINE_UNREACHABLE: {0}")]
    PolicyEngineUnreachable(String),

    #[error("VERIFICATION_UNAVAILABLE: cosign verification unavailable (network/infra)")]
    VerificationUnavailable,

    #[error("RATE_LIMITED: {0}")]
    RateLimited(String),

    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdmissionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AdmissionError::PolicyEngineUnreachable(_) => StatusCode::BAD_GATEWAY,
            AdmissionError::VerificationUnavailable => StatusCode::OK,
            AdmissionError::RateLimited(_) => StatusCode::OK,
            AdmissionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %self, "admission error");
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
