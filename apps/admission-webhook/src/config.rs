// [apps/admission-webhook/src/config.rs]
//! Lectura de configuracion de arranque desde variables de entorno. Nada
//! de esto se recarga en caliente salvo la configuracion de cosign, que
//! vive en su propio `CosignConfigStore` con soporte de `reload()`.

use std::collections::HashMap;

/// Variables de entorno que alimentan la ignicion del webhook. Ver
/// `restricted_key_paths` para el formato esperado de `RESTRICTED_KEY_PATHS`.
pub struct WebhookConfig {
    pub listen_port: u16,
    pub policy_engine_base_url: String,
    pub allowed_registries: Vec<String>,
    pub cosign_config_path: String,
    pub cosign_binary_path: String,
    pub crictl_binary_path: String,
    pub restricted_key_paths: HashMap<String, String>,
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Parsea `RESTRICTED_KEY_PATHS` como una lista `namespace=path` separada
/// por comas, p.ej. `chutes=/etc/chutes/cosign.pub`.
fn parse_restricted_key_paths(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|entry| entry.split_once('='))
        .map(|(namespace, path)| (namespace.trim().to_string(), path.trim().to_string()))
        .collect()
}

impl WebhookConfig {
    pub fn from_env() -> Self {
        Self {
            listen_port: std::env::var("LISTEN_PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(8443),
            policy_engine_base_url: std::env::var("POLICY_ENGINE_BASE_URL")
                .expect("POLICY_ENGINE_BASE_URL must be set"),
            allowed_registries: split_csv(&std::env::var("ALLOWED_REGISTRIES").unwrap_or_else(|_| "docker.io".to_string())),
            cosign_config_path: std::env::var("COSIGN_CONFIG_PATH")
                .unwrap_or_else(|_| "/etc/chutes/cosign-config.yaml".to_string()),
            cosign_binary_path: std::env::var("COSIGN_BINARY_PATH").unwrap_or_else(|_| "cosign".to_string()),
            crictl_binary_path: std::env::var("CRICTL_BINARY_PATH").unwrap_or_else(|_| "crictl".to_string()),
            restricted_key_paths: std::env::var("RESTRICTED_KEY_PATHS")
                .map(|raw| parse_restricted_key_paths(&raw))
                .unwrap_or_default(),
        }
    }
}
