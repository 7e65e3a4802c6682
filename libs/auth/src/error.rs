// [libs/auth/src/error.rs]
//! Catalogacion de fallos de autorizacion. Ninguna variante expone detalle
//! interno al llamante: `IntoResponse` siempre responde 401 con el mismo
//! cuerpo fijo, el motivo real solo se traza server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("MISSING_HEADER: required signed-request header absent: {0}")]
    MissingHeader(&'static str),

    #[error("UNKNOWN_SIGNER: hotkey not in the allowed set for this purpose")]
    UnknownSigner,

    #[error("NONCE_OUT_OF_WINDOW: |now - nonce| exceeded the replay window")]
    NonceOutOfWindow,

    #[error("MALFORMED_SIGNATURE: signature or hotkey could not be decoded")]
    MalformedSignature,

    #[error("SIGNATURE_MISMATCH: SR25519 verification failed")]
    SignatureMismatch,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!(reason = %self, "auth rejection");
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "go away" }))).into_response()
    }
}
