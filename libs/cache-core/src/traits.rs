// [libs/cache-core/src/traits.rs]
//! Puertos que el gestor de cache consume sin conocer el formato de red
//! concreto de Hugging Face Hub: quien descarga los pesos y quien conoce
//! la identidad y el manifiesto de un repositorio.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CacheError;
use crate::model::{RepoIdentity, RepoManifest};

#[async_trait]
pub trait SnapshotDownloader: Send + Sync {
    /// Descarga el arbol de modelo de `(repo_id, revision)` bajo `hub_path`
    /// y devuelve la ruta materializada del snapshot. Llamada bloqueante
    /// por naturaleza en la fuente original; aqui una future que corre en
    /// su propia tarea para no retener ningun lock del gestor.
    async fn download(
        &self,
        repo_id: &str,
        revision: &str,
        hub_path: &Path,
    ) -> Result<PathBuf, CacheError>;
}

#[async_trait]
pub trait ManifestClient: Send + Sync {
    /// Resuelve `(repo_id, revision)` para un chute dado.
    async fn fetch_identity(&self, chute_id: &str) -> Result<RepoIdentity, CacheError>;

    /// Obtiene la lista de archivos y hashes de una revision concreta.
    async fn fetch_manifest(&self, repo_id: &str, revision: &str) -> Result<RepoManifest, CacheError>;
}
