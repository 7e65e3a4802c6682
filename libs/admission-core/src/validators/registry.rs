// [libs/admission-core/src/validators/registry.rs]
//! Valida que toda imagen de la peticion provenga de un registro permitido.

use async_trait::async_trait;

use crate::image_ref::extract_registry;
use crate::model::ValidationResult;
use crate::validators::{AdmissionContext, Validator};

pub struct RegistryValidator {
    allowed_registries: Vec<String>,
}

impl RegistryValidator {
    pub fn new(allowed_registries: Vec<String>) -> Self {
        Self { allowed_registries }
    }

    fn is_allowed(&self, registry: &str) -> bool {
        let registry = registry.to_ascii_lowercase();
        self.allowed_registries.iter().any(|entry| {
            let entry = entry.to_ascii_lowercase();
            match entry.strip_suffix('*') {
                Some(prefix) => registry.starts_with(prefix),
                None => entry == registry,
            }
        })
    }
}

#[async_trait]
impl Validator for RegistryValidator {
    fn name(&self) -> &str {
        "registry"
    }

    async fn validate(&self, ctx: &AdmissionContext) -> ValidationResult {
        let mut violations = Vec::new();
        for image in &ctx.images {
            let registry = extract_registry(image);
            if !self.is_allowed(&registry) {
                violations.push(format!("Image {image} uses disallowed registry {registry}"));
            }
        }
        ctx.policy.apply(violations)
    }
}
