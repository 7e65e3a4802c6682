// [libs/cache-core/src/model.rs]
//! Tipos de datos compartidos por el gestor de cache: el estado derivado
//! de un snapshot, el manifiesto remoto, y el resultado de una limpieza.

use serde::{Deserialize, Serialize};

/// Identidad de un chute resuelta desde el servicio de manifiestos.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoIdentity {
    pub repo_id: String,
    #[serde(default = "default_revision")]
    pub revision: String,
}

fn default_revision() -> String {
    "main".to_string()
}

/// Una entrada del manifiesto remoto de archivos de un repositorio.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestFileEntry {
    pub path: String,
    #[serde(default)]
    pub is_lfs: bool,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub blob_id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoManifest {
    pub files: Vec<ManifestFileEntry>,
}

impl RepoManifest {
    /// Suma el tamano de todos los archivos listados; usado como estimacion
    /// de tamano total para calcular porcentaje y ETA durante la descarga.
    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().filter_map(|entry| entry.size).sum()
    }
}

/// Estado derivado de un snapshot: nunca se persiste, siempre se calcula a
/// partir del estado en memoria y de los marcadores en disco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    InProgress,
    Failed,
    Present,
    Stale,
    Incomplete,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadOutcomeStatus {
    Started,
    Present,
    InProgress,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadStatusEntry {
    pub chute_id: String,
    pub repo_id: String,
    pub revision: String,
    pub status: Status,
    pub percent: Option<f64>,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub rate_bytes_per_sec: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewEntry {
    pub chute_id: String,
    pub repo_id: String,
    pub revision: String,
    pub size_bytes: u64,
    pub last_accessed: chrono::DateTime<chrono::Utc>,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CleanupResult {
    pub freed_bytes: u64,
    pub removed_chutes: Vec<String>,
}
