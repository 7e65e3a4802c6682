// [libs/admission-core/src/validators/mod.rs]
//! Contrato comun de los validadores de admision y extraccion de imagenes
//! de un pod spec, compartida por el validador de registro y el de firmas.

pub mod policy;
pub mod registry;
pub mod signature;

use async_trait::async_trait;
use serde_json::Value;

use crate::model::{AdmissionRequest, NamespacePolicy, Operation, ValidationResult};

/// Kinds que, en alguna forma, acaban produciendo un pod spec inspeccionable.
const POD_PRODUCING_KINDS: &[&str] = &[
    "Pod",
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "Job",
    "CronJob",
    "ReplicaSet",
];

/// El contexto que cada validador recibe para una peticion dada: la
/// peticion cruda, las imagenes ya extraidas (vacio si el kind/operacion no
/// aplica), y la politica resuelta del namespace.
pub struct AdmissionContext {
    pub request: AdmissionRequest,
    pub images: Vec<String>,
    pub policy: NamespacePolicy,
}

impl AdmissionContext {
    pub fn new(request: AdmissionRequest, policy: NamespacePolicy) -> Self {
        let images = extract_images(&request);
        Self {
            request,
            images,
            policy,
        }
    }

    pub fn namespace(&self) -> &str {
        self.request.namespace.as_deref().unwrap_or("default")
    }
}

#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    async fn validate(&self, ctx: &AdmissionContext) -> ValidationResult;

    /// Sonda de salud ligera; por defecto siempre sana.
    async fn health(&self) -> bool {
        true
    }
}

/// Extrae toda imagen de contenedor referenciada por la peticion. Vacio
/// para operaciones no mutantes (DELETE, CONNECT) o kinds que no producen
/// un pod spec.
pub fn extract_images(request: &AdmissionRequest) -> Vec<String> {
    if !request.operation.is_image_bearing() {
        return Vec::new();
    }
    if !POD_PRODUCING_KINDS.contains(&request.kind.kind.as_str()) {
        return Vec::new();
    }

    let Some(object) = request.object.as_ref() else {
        return Vec::new();
    };

    let pod_spec = match request.kind.kind.as_str() {
        "Pod" => object.pointer("/spec"),
        "CronJob" => object.pointer("/spec/jobTemplate/spec/template/spec"),
        _ => object.pointer("/spec/template/spec"),
    };

    let Some(pod_spec) = pod_spec else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for container_field in ["containers", "initContainers", "ephemeralContainers"] {
        collect_images_from_container_list(pod_spec, container_field, &mut images);
    }
    images
}

fn collect_images_from_container_list(pod_spec: &Value, field: &str, out: &mut Vec<String>) {
    let Some(containers) = pod_spec.get(field).and_then(Value::as_array) else {
        return;
    };
    for container in containers {
        if let Some(image) = container.get("image").and_then(Value::as_str) {
            out.push(image.to_string());
        }
    }
}
