// [libs/admission-core/src/controller.rs]
/*!
 * APARATO: ADMISSION CONTROLLER (ESTRATO L2-DOMAIN)
 * RESPONSABILIDAD: ORQUESTACION PARALELA DE VALIDADORES
 *
 * Reparte una peticion entre todos los validadores registrados, combina
 * sus veredictos preservando el orden, y memoiza el resultado cuando es
 * seguro hacerlo. Un panico o un error de cualquier validador individual
 * nunca escapa como un 500: se convierte en una violacion mas.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use moka::sync::Cache;

use crate::model::{AdmissionRequest, AdmissionResponse, NamespacePolicy, ValidationResult};
use crate::namespace_policy::NamespacePolicyStore;
use crate::validators::{AdmissionContext, Validator};
use crate::{metrics, validators};

const RESULT_CACHE_CAPACITY: u64 = 1024;
const RESULT_CACHE_TTL: Duration = Duration::from_secs(20 * 60);

pub struct HealthReport {
    pub healthy: bool,
    pub validators: HashMap<String, bool>,
}

pub struct Controller {
    validators: Vec<Arc<dyn Validator>>,
    namespace_policies: Arc<NamespacePolicyStore>,
    result_cache: Cache<String, ValidationResult>,
}

impl Controller {
    pub fn new(validators: Vec<Arc<dyn Validator>>, namespace_policies: Arc<NamespacePolicyStore>) -> Self {
        Self {
            validators,
            namespace_policies,
            result_cache: Cache::builder()
                .max_capacity(RESULT_CACHE_CAPACITY)
                .time_to_live(RESULT_CACHE_TTL)
                .build(),
        }
    }

    pub async fn validate(&self, request: AdmissionRequest) -> AdmissionResponse {
        let namespace = request.namespace.clone().unwrap_or_else(|| "default".to_string());
        let policy: NamespacePolicy = self.namespace_policies.policy_for(&namespace);
        let kind = request.kind.kind.clone();
        let operation = request.operation;
        let uid = request.uid.clone();

        let images = validators::extract_images(&request);
        let cache_key = build_cache_key(&namespace, &kind, &images);

        if let Some(cached) = self.result_cache.get(&cache_key) {
            metrics::CACHE_HITS_TOTAL.inc();
            metrics::record_decision(&kind, operation.label(), cached.allowed);
            return cached.into_response(&uid);
        }
        metrics::CACHE_MISSES_TOTAL.inc();

        let ctx = Arc::new(AdmissionContext::new(request, policy));

        let timer = metrics::VALIDATION_DURATION_SECONDS.start_timer();
        let tasks = self.validators.iter().cloned().map(|validator| {
            let ctx = ctx.clone();
            let name = validator.name().to_string();
            async move {
                match tokio::spawn(async move { validator.validate(&ctx).await }).await {
                    Ok(result) => result,
                    Err(_join_error) => {
                        metrics::record_validator_error(&name);
                        ValidationResult::deny(format!("{name}: Internal error"))
                    }
                }
            }
        });

        let results = join_all(tasks).await;
        timer.observe_duration();

        let merged = ValidationResult::merge(results);

        if merged.cacheable {
            self.result_cache.insert(cache_key, merged.clone());
        }

        metrics::record_decision(&kind, operation.label(), merged.allowed);

        merged.into_response(&uid)
    }

    pub async fn health(&self) -> HealthReport {
        let mut per_validator = HashMap::new();
        let mut healthy = true;
        for validator in &self.validators {
            let ok = validator.health().await;
            healthy = healthy && ok;
            per_validator.insert(validator.name().to_string(), ok);
        }
        HealthReport {
            healthy,
            validators: per_validator,
        }
    }
}

fn build_cache_key(namespace: &str, kind: &str, images: &[String]) -> String {
    let mut sorted_images = images.to_vec();
    sorted_images.sort();
    format!("{namespace}|{kind}|{}", sorted_images.join(","))
}
