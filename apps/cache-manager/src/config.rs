// [apps/cache-manager/src/config.rs]
//! Configuracion de arranque del gestor de cache: base de disco, el
//! servicio de manifiestos/descarga aguas arriba, y las identidades
//! autorizadas a firmar peticiones.

use std::collections::HashSet;
use std::path::PathBuf;

pub struct CacheManagerConfig {
    pub listen_port: u16,
    pub cache_base: PathBuf,
    pub hub_metadata_base_url: String,
    pub hub_resolve_base_url: String,
    pub outbound_hotkey: Option<String>,
    pub outbound_seed_hex: Option<String>,
    pub miner_hotkey: String,
    pub validator_hotkeys: HashSet<String>,
}

fn split_csv(raw: &str) -> HashSet<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

impl CacheManagerConfig {
    pub fn from_env() -> Self {
        Self {
            listen_port: std::env::var("LISTEN_PORT").ok().and_then(|raw| raw.parse().ok()).unwrap_or(8000),
            cache_base: std::env::var("CACHE_BASE_DIR").unwrap_or_else(|_| "/cache".to_string()).into(),
            hub_metadata_base_url: std::env::var("HUB_METADATA_BASE_URL").expect("HUB_METADATA_BASE_URL must be set"),
            hub_resolve_base_url: std::env::var("HUB_RESOLVE_BASE_URL")
                .unwrap_or_else(|_| "https://huggingface.co".to_string()),
            outbound_hotkey: std::env::var("CACHE_MANAGER_HOTKEY").ok(),
            outbound_seed_hex: std::env::var("CACHE_MANAGER_SEED_HEX").ok(),
            miner_hotkey: std::env::var("MINER_HOTKEY").expect("MINER_HOTKEY must be set"),
            validator_hotkeys: split_csv(&std::env::var("VALIDATOR_HOTKEYS").unwrap_or_default()),
        }
    }
}
