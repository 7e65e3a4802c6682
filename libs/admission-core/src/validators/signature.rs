// [libs/admission-core/src/validators/signature.rs]
//! El validador mas exigente: resuelve configuracion jerarquica por imagen,
//! aplica el conjunto de reglas segun si el namespace es restringido, y
//! delega la verificacion criptografica a `chutes_signature_verifier`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chutes_signature_verifier::{
    DigestResolver, SignatureVerifier, VerificationMethod as VerifierMethod, VerifierError, VerifyRequest,
};

use crate::cosign_config::CosignConfigStore;
use crate::image_ref::parse_image_reference;
use crate::model::{CosignVerificationConfig, ValidationResult, VerificationMethod};
use crate::namespace_policy::RESTRICTED_NAMESPACES;
use crate::validators::{AdmissionContext, Validator};

pub struct SignatureValidator {
    config_store: Arc<CosignConfigStore>,
    verifier: Arc<SignatureVerifier>,
    digest_resolver: Arc<dyn DigestResolver>,
    restricted_key_paths: HashMap<String, String>,
}

impl SignatureValidator {
    pub fn new(
        config_store: Arc<CosignConfigStore>,
        verifier: Arc<SignatureVerifier>,
        digest_resolver: Arc<dyn DigestResolver>,
        restricted_key_paths: HashMap<String, String>,
    ) -> Self {
        Self {
            config_store,
            verifier,
            digest_resolver,
            restricted_key_paths,
        }
    }

    /// Revisa las reglas de un namespace restringido para una imagen dada.
    /// `Ok(config)` cuando la configuracion cumple todas las reglas y debe
    /// procederse a verificar; `Err(violation)` en caso contrario.
    fn check_restricted_rules(
        &self,
        namespace: &str,
        image: &str,
        config: Option<&CosignVerificationConfig>,
    ) -> Result<CosignVerificationConfig, String> {
        let config = config.ok_or_else(|| format!("Image {image}: no signature verification configuration found"))?;

        if config.verification_method == VerificationMethod::Disabled {
            return Err(format!("Image {image}: signature verification disabled in restricted namespace"));
        }
        if config.verification_method != VerificationMethod::Key {
            return Err(format!("Image {image}: restricted namespace requires key-based verification"));
        }

        let required_key_path = self.restricted_key_paths.get(namespace);
        match (required_key_path, &config.public_key) {
            (Some(required), Some(actual)) if required == actual => Ok(config.clone()),
            _ => Err(format!("Image {image}: public key does not match namespace's required key")),
        }
    }

    fn to_verify_request(image_reference: String, config: &CosignVerificationConfig) -> VerifyRequest {
        VerifyRequest {
            image_reference,
            method: match config.verification_method {
                VerificationMethod::Key => VerifierMethod::Key,
                VerificationMethod::Keyless => VerifierMethod::Keyless,
                VerificationMethod::Disabled => VerifierMethod::Disabled,
            },
            public_key_path: config.public_key.clone(),
            keyless_identity_regex: config.keyless_identity_regex.clone(),
            keyless_issuer: config.keyless_issuer.clone(),
            rekor_url: config.rekor_url.clone(),
            fulcio_url: config.fulcio_url.clone(),
            allow_http: config.allow_http,
            allow_insecure: config.allow_insecure,
        }
    }
}

#[async_trait]
impl Validator for SignatureValidator {
    fn name(&self) -> &str {
        "signature"
    }

    async fn validate(&self, ctx: &AdmissionContext) -> ValidationResult {
        let namespace = ctx.namespace();
        let restricted = RESTRICTED_NAMESPACES.contains(&namespace);

        let mut seen = HashSet::new();
        let mut violations = Vec::new();

        for image in &ctx.images {
            if !seen.insert(image.clone()) {
                continue;
            }

            let parsed = parse_image_reference(image);
            let config = self
                .config_store
                .get_verification_config(&parsed.registry, &parsed.org, &parsed.repo);

            let config = if restricted {
                match self.check_restricted_rules(namespace, image, config.as_ref()) {
                    Ok(config) => config,
                    Err(violation) => {
                        violations.push(violation);
                        continue;
                    }
                }
            } else {
                match config {
                    Some(config) if config.require_signature && config.verification_method != VerificationMethod::Disabled => config,
                    _ => continue,
                }
            };

            let resolved_reference = self
                .digest_resolver
                .resolve(image)
                .await
                .unwrap_or_else(|| image.clone());

            let request = Self::to_verify_request(resolved_reference, &config);

            match self.verifier.verify(&request).await {
                Ok(()) => {}
                Err(VerifierError::RateLimited(message)) => {
                    violations.push(message);
                    break;
                }
                Err(VerifierError::VerificationUnavailable) => {
                    return ValidationResult::deny_uncacheable(
                        "cosign verification unavailable (network/infra)",
                    );
                }
                Err(VerifierError::VerificationFailed(reason)) => {
                    violations.push(format!("Verification failed for {image}: {reason}"));
                }
            }
        }

        ctx.policy.apply(violations)
    }
}
