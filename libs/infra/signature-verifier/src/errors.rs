// [libs/infra/signature-verifier/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VerifierError {
    #[error("SIGNATURE_RATE_LIMITED: {0}")]
    RateLimited(String),

    #[error("VERIFICATION_UNAVAILABLE: cosign verification unavailable (network/infra)")]
    VerificationUnavailable,

    #[error("SIGNATURE_VERIFICATION_FAILED: {0}")]
    VerificationFailed(String),
}
