// [libs/infra/signature-verifier/src/digest_resolver.rs]
//! Resolucion best-effort de tag -> digest via el runtime de contenedores
//! local. Un fallo de cualquier tipo simplemente deja pasar la referencia
//! original: esto es una optimizacion de estabilidad de cache, no una
//! fuente de verdad.

use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait DigestResolver: Send + Sync {
    /// Intenta resolver `image_reference` a su forma `@sha256:...`. `None`
    /// si el runtime local no pudo responder por cualquier motivo.
    async fn resolve(&self, image_reference: &str) -> Option<String>;
}

#[derive(Deserialize)]
struct CrictlInspectStatus {
    status: CrictlImageStatus,
}

#[derive(Deserialize)]
struct CrictlImageStatus {
    #[serde(rename = "repoDigests", default)]
    repo_digests: Vec<String>,
}

/// Invoca `crictl inspecti` para resolver el digest de una imagen ya
/// conocida por el container runtime del nodo.
pub struct CrictlDigestResolver {
    binary_path: String,
}

impl Default for CrictlDigestResolver {
    fn default() -> Self {
        Self {
            binary_path: "crictl".to_string(),
        }
    }
}

impl CrictlDigestResolver {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl DigestResolver for CrictlDigestResolver {
    async fn resolve(&self, image_reference: &str) -> Option<String> {
        let output = tokio::process::Command::new(&self.binary_path)
            .args(["inspecti", "-o", "json", image_reference])
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let parsed: CrictlInspectStatus = serde_json::from_slice(&output.stdout).ok()?;
        parsed.status.repo_digests.into_iter().next()
    }
}
