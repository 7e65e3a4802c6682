// [libs/cache-core/src/verify.rs]
//! Verificacion de un snapshot en disco contra el manifiesto remoto, y el
//! cache en proceso de manifiestos ya obtenidos.

use std::path::Path;
use std::sync::Arc;

use moka::sync::Cache;
use thiserror::Error;

use crate::model::RepoManifest;
use crate::traits::ManifestClient;

const LEGACY_DIGEST_LEN: usize = 40;
const BLOB_DIGEST_LEN: usize = 64;

#[derive(Error, Debug, Clone)]
pub enum VerifyError {
    #[error("Missing file: {0}")]
    MissingFile(String),

    #[error("Size mismatch: {0}")]
    SizeMismatch(String),

    #[error("Hash mismatch: {0}")]
    HashMismatch(String),

    #[error("verification failed: could not fetch manifest for {repo_id}@{revision}: {detail}")]
    ManifestUnreachable {
        repo_id: String,
        revision: String,
        detail: String,
    },
}

#[derive(Clone)]
pub struct ManifestCache {
    inner: Cache<(String, String), Arc<RepoManifest>>,
}

impl ManifestCache {
    pub fn new(max_capacity: u64) -> Self {
        // Sin `time_to_live`: una revision nueva es una clave nueva, asi que
        // el propio manifiesto nunca queda obsoleto bajo la misma clave.
        Self { inner: Cache::builder().max_capacity(max_capacity).build() }
    }

    async fn get_or_fetch(
        &self,
        client: &dyn ManifestClient,
        repo_id: &str,
        revision: &str,
    ) -> Result<Arc<RepoManifest>, VerifyError> {
        let key = (repo_id.to_string(), revision.to_string());
        if let Some(cached) = self.inner.get(&key) {
            return Ok(cached);
        }
        let manifest = client
            .fetch_manifest(repo_id, revision)
            .await
            .map_err(|err| VerifyError::ManifestUnreachable {
                repo_id: repo_id.to_string(),
                revision: revision.to_string(),
                detail: err.to_string(),
            })?;
        let manifest = Arc::new(manifest);
        self.inner.insert(key, manifest.clone());
        Ok(manifest)
    }
}

/// Verifica que `snapshot_path` contenga cada archivo no ignorado del
/// manifiesto remoto de `(repo_id, revision)`, con el tamano y hash
/// esperados.
pub async fn verify_cache(
    manifest_client: &dyn ManifestClient,
    manifest_cache: &ManifestCache,
    repo_id: &str,
    revision: &str,
    snapshot_path: &Path,
) -> Result<(), VerifyError> {
    let manifest = manifest_cache.get_or_fetch(manifest_client, repo_id, revision).await?;

    for entry in &manifest.files {
        if entry.path.starts_with('_') {
            continue;
        }

        let local_path = snapshot_path.join(&entry.path);
        let metadata = match std::fs::symlink_metadata(&local_path) {
            Ok(metadata) => metadata,
            Err(_) => return Err(VerifyError::MissingFile(entry.path.clone())),
        };

        let remote_digest = entry.sha256.as_deref().or(entry.blob_id.as_deref());
        let remote_digest = match remote_digest {
            None => continue,
            Some(digest) if digest.len() == LEGACY_DIGEST_LEN => continue,
            Some(digest) => digest,
        };

        if metadata.file_type().is_symlink() {
            if let Ok(target) = std::fs::read_link(&local_path) {
                if let Some(actual_size) = target_size(snapshot_path, &local_path, &target) {
                    if let Some(expected_size) = entry.size {
                        if expected_size != actual_size {
                            return Err(VerifyError::SizeMismatch(format!(
                                "{}: expected {} bytes, found {}",
                                entry.path, expected_size, actual_size
                            )));
                        }
                    }
                }
                if let Some(blob_name) = target.file_name().and_then(|name| name.to_str()) {
                    if blob_name.len() == BLOB_DIGEST_LEN && blob_name != remote_digest {
                        return Err(VerifyError::HashMismatch(format!(
                            "{}: expected {}, found {}",
                            entry.path, remote_digest, blob_name
                        )));
                    }
                }
            }
        } else if let Some(expected_size) = entry.size {
            if expected_size != metadata.len() {
                return Err(VerifyError::SizeMismatch(format!(
                    "{}: expected {} bytes, found {}",
                    entry.path,
                    expected_size,
                    metadata.len()
                )));
            }
        }
    }

    Ok(())
}

fn target_size(snapshot_path: &Path, local_path: &Path, target: &Path) -> Option<u64> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        local_path.parent().unwrap_or(snapshot_path).join(target)
    };
    std::fs::metadata(resolved).ok().map(|metadata| metadata.len())
}
