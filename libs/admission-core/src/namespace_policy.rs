// [libs/admission-core/src/namespace_policy.rs]
//! Politica de aplicacion por namespace. Los valores por defecto son
//! hardcoded: no hay fuente externa de configuracion para esta tabla.

use std::collections::HashMap;

use crate::model::{EnforcementMode, NamespacePolicy};

/// Namespaces cuyas violaciones solo se advierten, nunca deniegan.
const WARN_ONLY_NAMESPACES: &[&str] = &["kube-system", "kube-public", "kube-node-lease", "gpu-operator"];

/// Namespaces restringidos: toda imagen debe tener configuracion de firma
/// y usar verificacion por clave, consultados por el validador de firmas.
pub const RESTRICTED_NAMESPACES: &[&str] = &["chutes"];

pub struct NamespacePolicyStore {
    overrides: HashMap<String, NamespacePolicy>,
}

impl Default for NamespacePolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespacePolicyStore {
    pub fn new() -> Self {
        let mut overrides = HashMap::new();
        for namespace in WARN_ONLY_NAMESPACES {
            overrides.insert(
                namespace.to_string(),
                NamespacePolicy {
                    mode: EnforcementMode::Warn,
                    exempt: false,
                },
            );
        }
        for namespace in ["chutes", "default"] {
            overrides.insert(namespace.to_string(), NamespacePolicy::default());
        }
        Self { overrides }
    }

    pub fn policy_for(&self, namespace: &str) -> NamespacePolicy {
        self.overrides.get(namespace).copied().unwrap_or_default()
    }

    pub fn is_restricted(&self, namespace: &str) -> bool {
        RESTRICTED_NAMESPACES.contains(&namespace)
    }
}
