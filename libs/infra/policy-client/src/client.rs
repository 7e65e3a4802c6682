// [libs/infra/policy-client/src/client.rs]
/*!
 * APARATO: POLICY ENGINE UPLINK (ESTRATO L3-INFRA)
 * RESPONSABILIDAD: CONSULTA AL MOTOR DE POLITICAS EXTERNO
 *
 * Envia la peticion de admision cruda junto con el contexto de registros
 * permitidos y la politica del namespace; el motor decide, este cliente
 * solo traduce su veredicto a una lista de mensajes de violacion.
 */

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::errors::PolicyClientError;

const POLICY_TIMEOUT: Duration = Duration::from_secs(30);
const DENY_QUERY_PATH: &str = "/v1/data/kubernetes/admission/deny";

#[derive(Serialize)]
pub struct PolicyQueryPayload {
    pub input: PolicyQueryInput,
}

#[derive(Serialize)]
pub struct PolicyQueryInput {
    pub request: serde_json::Value,
    pub allowed_registries: Vec<String>,
    pub namespace_policy: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct PolicyResponseEnvelope {
    #[serde(default)]
    result: Vec<PolicyResultItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyResultItem {
    Structured { msg: String },
    Bare(String),
}

impl PolicyResultItem {
    fn into_message(self) -> String {
        match self {
            PolicyResultItem::Structured { msg } => msg,
            PolicyResultItem::Bare(message) => message,
        }
    }
}

pub struct PolicyEngineClient {
    http: Client,
    endpoint: String,
}

impl PolicyEngineClient {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            http: Client::builder()
                .timeout(POLICY_TIMEOUT)
                .user_agent("chutes-admission-webhook/policy-client")
                .build()
                .expect("reqwest client construction must not fail"),
            endpoint: format!("{}{}", base_url.as_ref().trim_end_matches('/'), DENY_QUERY_PATH),
        }
    }

    /// Evalua la peticion contra el motor de politicas. Una lista vacia
    /// significa "sin violaciones"; el llamador decide como traducirla
    /// segun el modo de aplicacion del namespace.
    #[instrument(skip(self, payload))]
    pub async fn evaluate(&self, payload: &PolicyQueryPayload) -> Result<Vec<String>, PolicyClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PolicyClientError::Timeout
                } else {
                    PolicyClientError::NetworkFault(err)
                }
            })?;

        if response.status() != StatusCode::OK {
            return Err(PolicyClientError::ServerRejection(format!("HTTP_{}", response.status())));
        }

        let envelope: PolicyResponseEnvelope = response.json().await?;
        Ok(envelope.result.into_iter().map(PolicyResultItem::into_message).collect())
    }
}
