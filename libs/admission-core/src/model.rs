// [libs/admission-core/src/model.rs]
//! Tipos de datos de admission: el sobre AdmissionReview que entra y sale
//! del webhook, el veredicto combinado, y la politica por namespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operacion de la peticion de admision, tal como la emite el API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

impl Operation {
    /// Las mutaciones que los validadores de imagen deben inspeccionar.
    /// Connect nunca acarrea un pod spec nuevo: se trata como no-mutante.
    pub fn is_image_bearing(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    pub operation: Operation,
    pub namespace: Option<String>,
    #[serde(default)]
    pub object: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionResponseStatus {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionResponseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionReview {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub request: Option<AdmissionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

fn default_api_version() -> String {
    "admission.k8s.io/v1".to_string()
}

fn default_kind() -> String {
    "AdmissionReview".to_string()
}

impl AdmissionReview {
    pub fn reply(request_uid: &str, result: ValidationResult) -> Self {
        AdmissionReview {
            api_version: default_api_version(),
            kind: default_kind(),
            request: None,
            response: Some(result.into_response(request_uid)),
        }
    }
}

/// Resultado de un validador individual; tambien el tipo sobre el que se
/// combinan todos los resultados de una peticion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub allowed: bool,
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
    /// Falso cuando el resultado proviene de un fallo de infraestructura
    /// transitorio (p.ej. verificador de firmas inalcanzable): la cache de
    /// resultados de admision nunca debe retener un resultado asi.
    #[serde(default = "default_cacheable")]
    pub cacheable: bool,
}

fn default_cacheable() -> bool {
    true
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::allow()
    }
}

impl ValidationResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            messages: Vec::new(),
            warnings: Vec::new(),
            cacheable: true,
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            messages: vec![message.into()],
            warnings: Vec::new(),
            cacheable: true,
        }
    }

    pub fn deny_uncacheable(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            messages: vec![message.into()],
            warnings: Vec::new(),
            cacheable: false,
        }
    }

    pub fn allow_with_warning(warning: impl Into<String>) -> Self {
        Self {
            allowed: true,
            messages: Vec::new(),
            warnings: vec![warning.into()],
            cacheable: true,
        }
    }

    pub fn into_response(self, request_uid: &str) -> AdmissionResponse {
        let status = if self.messages.is_empty() {
            None
        } else {
            Some(AdmissionResponseStatus {
                message: self.messages.join("; "),
            })
        };
        let warnings = if self.warnings.is_empty() { None } else { Some(self.warnings) };

        AdmissionResponse {
            uid: request_uid.to_string(),
            allowed: self.allowed,
            status,
            warnings,
        }
    }

    /// Combina en orden, preservando el orden de validadores como exige la
    /// garantia de concatenacion de mensajes.
    pub fn merge(results: Vec<ValidationResult>) -> Self {
        let mut merged = ValidationResult::allow();
        for result in results {
            merged.allowed = merged.allowed && result.allowed;
            merged.cacheable = merged.cacheable && result.cacheable;
            merged.messages.extend(result.messages);
            merged.warnings.extend(result.warnings);
        }
        merged
    }
}

/// Modo de aplicacion de un namespace: como se traduce una violacion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    Enforce,
    Warn,
    Monitor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NamespacePolicy {
    pub mode: EnforcementMode,
    pub exempt: bool,
}

impl Default for NamespacePolicy {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::Enforce,
            exempt: false,
        }
    }
}

impl NamespacePolicy {
    /// Traduce una lista de violaciones crudas al `ValidationResult` segun
    /// el modo del namespace. Namespaces exentos siempre permiten.
    pub fn apply(self, violations: Vec<String>) -> ValidationResult {
        if self.exempt || violations.is_empty() {
            return ValidationResult::allow();
        }

        match self.mode {
            EnforcementMode::Enforce => ValidationResult {
                allowed: false,
                messages: violations,
                warnings: Vec::new(),
                cacheable: true,
            },
            EnforcementMode::Warn => ValidationResult {
                allowed: true,
                messages: Vec::new(),
                warnings: violations,
                cacheable: true,
            },
            EnforcementMode::Monitor => {
                for violation in &violations {
                    tracing::info!(violation = %violation, "admission violation observed in monitor mode");
                }
                ValidationResult::allow()
            }
        }
    }
}

/// Metodo de verificacion de firma de imagen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    Key,
    Keyless,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosignVerificationConfig {
    pub require_signature: bool,
    pub verification_method: VerificationMethod,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub keyless_identity_regex: Option<String>,
    #[serde(default)]
    pub keyless_issuer: Option<String>,
    #[serde(default = "default_rekor_url")]
    pub rekor_url: String,
    #[serde(default = "default_fulcio_url")]
    pub fulcio_url: String,
    #[serde(default)]
    pub allow_http: bool,
    #[serde(default)]
    pub allow_insecure: bool,
}

fn default_rekor_url() -> String {
    "https://rekor.sigstore.dev".to_string()
}

fn default_fulcio_url() -> String {
    "https://fulcio.sigstore.dev".to_string()
}

/// Una imagen de contenedor descompuesta en sus partes direccionables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImageReference {
    pub registry: String,
    pub org: String,
    pub repo: String,
    pub tag_or_digest: Option<String>,
    pub is_digest: bool,
}

impl ParsedImageReference {
    /// Reconstruye la cadena `registry/org/repo:tag` (o `@sha256:...`).
    pub fn to_image_string(&self) -> String {
        let base = format!("{}/{}/{}", self.registry, self.org, self.repo);
        match &self.tag_or_digest {
            Some(reference) if self.is_digest => format!("{}@{}", base, reference),
            Some(reference) => format!("{}:{}", base, reference),
            None => base,
        }
    }
}
