// [libs/admission-core/src/validators/policy.rs]
//! Delega la decision a un motor de politicas externo (p.ej. OPA) via
//! `chutes_policy_client`.

use async_trait::async_trait;
use chutes_policy_client::{PolicyClientError, PolicyEngineClient, PolicyQueryInput, PolicyQueryPayload};
use serde_json::json;

use crate::model::ValidationResult;
use crate::validators::{AdmissionContext, Validator};

pub struct PolicyValidator {
    client: PolicyEngineClient,
    allowed_registries: Vec<String>,
}

impl PolicyValidator {
    pub fn new(base_url: impl AsRef<str>, allowed_registries: Vec<String>) -> Self {
        Self {
            client: PolicyEngineClient::new(base_url),
            allowed_registries,
        }
    }
}

#[async_trait]
impl Validator for PolicyValidator {
    fn name(&self) -> &str {
        "policy"
    }

    async fn validate(&self, ctx: &AdmissionContext) -> ValidationResult {
        let payload = PolicyQueryPayload {
            input: PolicyQueryInput {
                request: json!({
                    "uid": ctx.request.uid,
                    "kind": ctx.request.kind.kind,
                    "operation": ctx.request.operation,
                    "namespace": ctx.request.namespace,
                    "object": ctx.request.object,
                }),
                allowed_registries: self.allowed_registries.clone(),
                namespace_policy: json!({
                    "mode": ctx.policy.mode,
                    "exempt": ctx.policy.exempt,
                }),
            },
        };

        match self.client.evaluate(&payload).await {
            Ok(violations) => ctx.policy.apply(violations),
            Err(PolicyClientError::Timeout) => ValidationResult::deny("Policy validation timeout"),
            Err(err) => ValidationResult::deny(err.to_string()),
        }
    }
}
