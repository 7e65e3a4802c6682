// [libs/infra/signature-verifier/src/verifier.rs]
/*!
 * APARATO: SIGNATURE VERIFIER (ESTRATO L3-INFRA)
 * RESPONSABILIDAD: INVOCACION DEL VERIFICADOR EXTERNO CON CACHE Y BACKOFF
 *
 * Envuelve una herramienta externa tipo `cosign verify`: cachea
 * resultados positivos y negativos por separado, honra un backoff de
 * rate-limit global, y distingue fallos de infraestructura (no
 * cacheables) de fallos de verificacion genuinos (cacheables).
 */

use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::sync::Cache;
use tracing::{info, warn};

use crate::errors::VerifierError;

const POSITIVE_CACHE_CAPACITY: u64 = 4096;
const POSITIVE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const NEGATIVE_CACHE_CAPACITY: u64 = 4096;
const NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5 * 60);

const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "429", "too many requests", "pull rate limit"];
const INFRA_FAILURE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "dial tcp",
    "i/o timeout",
    "no such host",
    "temporary failure",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethod {
    Key,
    Keyless,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub image_reference: String,
    pub method: VerificationMethod,
    pub public_key_path: Option<String>,
    pub keyless_identity_regex: Option<String>,
    pub keyless_issuer: Option<String>,
    pub rekor_url: String,
    pub fulcio_url: String,
    pub allow_http: bool,
    pub allow_insecure: bool,
}

impl VerifyRequest {
    /// Clave de cache que incluye la referencia resuelta, el metodo, la
    /// ruta de clave, los parametros keyless y las URLs, tal como exige la
    /// especificacion de cacheabilidad.
    fn cache_key(&self) -> String {
        format!(
            "{}|{:?}|{}|{}|{}|{}|{}|{}|{}",
            self.image_reference,
            self.method,
            self.public_key_path.as_deref().unwrap_or(""),
            self.keyless_identity_regex.as_deref().unwrap_or(""),
            self.keyless_issuer.as_deref().unwrap_or(""),
            self.rekor_url,
            self.fulcio_url,
            self.allow_http,
            self.allow_insecure,
        )
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["verify".to_string()];
        match self.method {
            VerificationMethod::Key => {
                if let Some(key) = &self.public_key_path {
                    args.push("--key".to_string());
                    args.push(key.clone());
                }
            }
            VerificationMethod::Keyless => {
                if let Some(regex) = &self.keyless_identity_regex {
                    args.push("--certificate-identity-regexp".to_string());
                    args.push(regex.clone());
                }
                if let Some(issuer) = &self.keyless_issuer {
                    args.push("--certificate-oidc-issuer".to_string());
                    args.push(issuer.clone());
                }
            }
            VerificationMethod::Disabled => {}
        }
        args.push("--rekor-url".to_string());
        args.push(self.rekor_url.clone());
        args.push("--fulcio-url".to_string());
        args.push(self.fulcio_url.clone());
        if self.allow_http {
            args.push("--allow-http-registry".to_string());
        }
        if self.allow_insecure {
            args.push("--insecure-ignore-tlog".to_string());
        }
        args.push(self.image_reference.clone());
        args
    }
}

/// Abstrae la invocacion del binario externo para permitir duplicados de
/// prueba que no dependen de tener `cosign` instalado.
#[async_trait]
pub trait VerifierBackend: Send + Sync {
    async fn invoke(&self, args: &[String]) -> std::io::Result<Output>;
}

pub struct CosignCliBackend {
    binary_path: String,
}

impl Default for CosignCliBackend {
    fn default() -> Self {
        Self {
            binary_path: "cosign".to_string(),
        }
    }
}

impl CosignCliBackend {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl VerifierBackend for CosignCliBackend {
    async fn invoke(&self, args: &[String]) -> std::io::Result<Output> {
        tokio::process::Command::new(&self.binary_path).args(args).output().await
    }
}

pub struct SignatureVerifier {
    backend: Arc<dyn VerifierBackend>,
    positive_cache: Cache<String, ()>,
    negative_cache: Cache<String, String>,
    rate_limit_until: Mutex<Option<Instant>>,
}

impl SignatureVerifier {
    pub fn new(backend: Arc<dyn VerifierBackend>) -> Self {
        Self {
            backend,
            positive_cache: Cache::builder()
                .max_capacity(POSITIVE_CACHE_CAPACITY)
                .time_to_live(POSITIVE_CACHE_TTL)
                .build(),
            negative_cache: Cache::builder()
                .max_capacity(NEGATIVE_CACHE_CAPACITY)
                .time_to_live(NEGATIVE_CACHE_TTL)
                .build(),
            rate_limit_until: Mutex::new(None),
        }
    }

    pub fn with_cosign_cli(binary_path: impl Into<String>) -> Self {
        Self::new(Arc::new(CosignCliBackend::new(binary_path)))
    }

    fn rate_limited(&self) -> bool {
        match *self.rate_limit_until.lock().expect("rate limit mutex poisoned") {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    fn trigger_rate_limit(&self) {
        let until = Instant::now() + RATE_LIMIT_BACKOFF;
        *self.rate_limit_until.lock().expect("rate limit mutex poisoned") = Some(until);
    }

    /// Verifica una imagen. `Disabled` siempre permite sin invocar nada.
    pub async fn verify(&self, request: &VerifyRequest) -> Result<(), VerifierError> {
        if request.method == VerificationMethod::Disabled {
            return Ok(());
        }

        if self.rate_limited() {
            return Err(VerifierError::RateLimited(
                "signature verifier is backing off after an upstream rate limit".to_string(),
            ));
        }

        let cache_key = request.cache_key();

        if self.positive_cache.contains_key(&cache_key) {
            return Ok(());
        }
        if let Some(reason) = self.negative_cache.get(&cache_key) {
            return Err(VerifierError::VerificationFailed(reason));
        }

        match self.invoke_backend(request).await {
            Ok(true) => {
                self.positive_cache.insert(cache_key, ());
                Ok(())
            }
            Ok(false) => {
                let reason = format!("no valid signatures found for {}", request.image_reference);
                self.negative_cache.insert(cache_key, reason.clone());
                Err(VerifierError::VerificationFailed(reason))
            }
            Err(VerifierError::RateLimited(message)) => {
                self.trigger_rate_limit();
                Err(VerifierError::RateLimited(message))
            }
            Err(VerifierError::VerificationUnavailable) => Err(VerifierError::VerificationUnavailable),
            Err(VerifierError::VerificationFailed(reason)) => {
                self.negative_cache.insert(cache_key, reason.clone());
                Err(VerifierError::VerificationFailed(reason))
            }
        }
    }

    async fn invoke_backend(&self, request: &VerifyRequest) -> Result<bool, VerifierError> {
        let args = request.to_cli_args();
        let output = self
            .backend
            .invoke(&args)
            .await
            .map_err(|_| VerifierError::VerificationUnavailable)?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let combined = format!("{stdout}\n{stderr}").to_ascii_lowercase();

        if !output.status.success() {
            if RATE_LIMIT_PATTERNS.iter().any(|pattern| combined.contains(pattern)) {
                warn!(image = %request.image_reference, "upstream signature verification rate limit detected");
                return Err(VerifierError::RateLimited(format!(
                    "rate limited verifying {}",
                    request.image_reference
                )));
            }
            if INFRA_FAILURE_PATTERNS.iter().any(|pattern| combined.contains(pattern)) {
                warn!(image = %request.image_reference, "signature verifier infra failure, not caching");
                return Err(VerifierError::VerificationUnavailable);
            }
            return Err(VerifierError::VerificationFailed(stderr.trim().to_string()));
        }

        let parsed: serde_json::Value = serde_json::from_str(stdout.trim())
            .map_err(|err| VerifierError::VerificationFailed(format!("malformed verifier output: {err}")))?;

        match parsed.as_array() {
            Some(entries) => {
                info!(image = %request.image_reference, entry_count = entries.len(), "signature verification completed");
                Ok(!entries.is_empty())
            }
            None => Err(VerifierError::VerificationFailed(
                "verifier output was not a JSON array".to_string(),
            )),
        }
    }
}
