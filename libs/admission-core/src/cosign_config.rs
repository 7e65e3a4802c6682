// [libs/admission-core/src/cosign_config.rs]
//! Almacen jerarquico de configuracion de verificacion de firmas: carga un
//! archivo YAML de entradas indexadas por `registry[/org[/repo]]` al
//! arranque y permite recargarlo sin reiniciar el proceso, distribuyendo
//! la version nueva a quien la este consultando via un canal `watch`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::watch;

use crate::error::AdmissionError;
use crate::model::CosignVerificationConfig;

#[derive(Debug, Clone)]
struct CosignConfigEntry {
    registry_pattern: String,
    org: Option<String>,
    repo: Option<String>,
    config: CosignVerificationConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfigFile {
    #[serde(flatten)]
    entries: HashMap<String, CosignVerificationConfig>,
}

fn parse_entries(raw: HashMap<String, CosignVerificationConfig>) -> Vec<CosignConfigEntry> {
    raw.into_iter()
        .map(|(key, config)| {
            let mut parts = key.splitn(3, '/');
            let registry_pattern = parts.next().unwrap_or("*").to_string();
            let org = parts.next().map(str::to_string);
            let repo = parts.next().map(str::to_string);
            CosignConfigEntry {
                registry_pattern,
                org,
                repo,
                config,
            }
        })
        .collect()
}

fn registry_pattern_matches(pattern: &str, registry: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let registry = registry.to_ascii_lowercase();

    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return registry.starts_with(prefix);
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return registry.ends_with(suffix);
    }
    pattern == registry
}

/// Puntua la especificidad de una entrada: repo > org > registro-solo, y
/// dentro de un mismo nivel, un patron de registro literal gana a uno con
/// comodin.
fn specificity(entry: &CosignConfigEntry) -> u32 {
    let registry_score = if entry.registry_pattern.contains('*') { 1 } else { 2 };
    let level_score = match (&entry.org, &entry.repo) {
        (Some(_), Some(_)) => 20,
        (Some(_), None) => 10,
        (None, _) => 0,
    };
    level_score + registry_score
}

/// Carga entradas de un archivo YAML u JSON (por extension) a disco.
fn load_entries_from_path(path: &Path) -> Result<Vec<CosignConfigEntry>, AdmissionError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| AdmissionError::InvalidRequest(format!("cannot read cosign config: {err}")))?;

    let raw: RawConfigFile = if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        serde_json::from_str(&contents)
            .map_err(|err| AdmissionError::InvalidRequest(format!("malformed cosign config: {err}")))?
    } else {
        serde_yaml::from_str(&contents)
            .map_err(|err| AdmissionError::InvalidRequest(format!("malformed cosign config: {err}")))?
    };

    Ok(parse_entries(raw.entries))
}

pub struct CosignConfigStore {
    path: PathBuf,
    sender: watch::Sender<Vec<CosignConfigEntry>>,
}

impl CosignConfigStore {
    /// Carga la configuracion inicial desde `path`. Un archivo ausente es
    /// tratado como configuracion vacia (ningun registro requiere firma).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries_from_path(&path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, path = %path.display(), "starting with empty cosign configuration");
            Vec::new()
        });
        let (sender, _receiver) = watch::channel(entries);
        Self { path, sender }
    }

    /// Re-lee el archivo en disco y distribuye la nueva version a todos los
    /// suscriptores via el canal `watch`. Pensado para dispararse desde un
    /// manejador de SIGHUP en el binario del webhook.
    pub fn reload(&self) -> Result<(), AdmissionError> {
        let entries = load_entries_from_path(&self.path)?;
        tracing::info!(entry_count = entries.len(), "cosign configuration reloaded");
        let _ = self.sender.send(entries);
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<CosignConfigEntry>> {
        self.sender.subscribe()
    }

    /// Resuelve la configuracion mas especifica para `(registry, org, repo)`,
    /// o `None` si nada coincide (equivale a "sin requisito de firma").
    pub fn get_verification_config(
        &self,
        registry: &str,
        org: &str,
        repo: &str,
    ) -> Option<CosignVerificationConfig> {
        resolve(&self.sender.borrow(), registry, org, repo)
    }
}

fn resolve(
    entries: &[CosignConfigEntry],
    registry: &str,
    org: &str,
    repo: &str,
) -> Option<CosignVerificationConfig> {
    entries
        .iter()
        .filter(|entry| registry_pattern_matches(&entry.registry_pattern, registry))
        .filter(|entry| match (&entry.org, &entry.repo) {
            (None, _) => true,
            (Some(entry_org), None) => entry_org == org,
            (Some(entry_org), Some(entry_repo)) => entry_org == org && entry_repo == repo,
        })
        .max_by_key(|entry| specificity(entry))
        .map(|entry| entry.config.clone())
}
