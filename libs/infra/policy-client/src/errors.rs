// [libs/infra/policy-client/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyClientError {
    #[error("POLICY_ENGINE_UNREACHABLE: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("POLICY_ENGINE_TIMEOUT: Policy validation timeout")]
    Timeout,

    #[error("POLICY_ENGINE_REJECTED: server returned status {0}")]
    ServerRejection(String),

    #[error("POLICY_ENGINE_MALFORMED: {0}")]
    Decoding(#[from] serde_json::Error),
}
