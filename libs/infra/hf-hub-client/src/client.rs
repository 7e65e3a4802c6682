// [libs/infra/hf-hub-client/src/client.rs]
/*!
 * APARATO: ENLACE HUGGING FACE HUB (ESTRATO L3-INFRA)
 * RESPONSABILIDAD: RESOLUCION DE IDENTIDAD, MANIFIESTO Y DESCARGA DE PESOS
 *
 * Dos clientes HTTP separados, igual que cualquier cliente de descargas
 * serio: uno de metadatos con timeout corto para no bloquear un admission
 * path, y uno de descarga sin timeout total (solo de conexion) porque un
 * modelo de decenas de gigabytes legitimamente tarda mas de 30 segundos.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chutes_auth::OutboundSigner;
use chutes_cache_core::{CacheError, ManifestClient, RepoIdentity, RepoManifest, SnapshotDownloader};
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};

use crate::errors::from_reqwest;
use crate::types::{HfInfoResponse, HfRepoInfoResponse};

const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
const OUTBOUND_SIGNING_PURPOSE: &str = "hf-manifest";

pub struct HfHubClient {
    metadata: reqwest::Client,
    download: reqwest::Client,
    base_url: String,
    resolve_base_url: String,
    signer: Option<Arc<OutboundSigner>>,
}

impl HfHubClient {
    pub fn new(base_url: impl Into<String>, resolve_base_url: impl Into<String>, signer: Option<Arc<OutboundSigner>>) -> Self {
        Self {
            metadata: reqwest::Client::builder()
                .timeout(METADATA_TIMEOUT)
                .user_agent("chutes-cache-manager/hf-hub-client")
                .build()
                .expect("reqwest client construction must not fail"),
            download: reqwest::Client::builder()
                .connect_timeout(METADATA_TIMEOUT)
                .user_agent("chutes-cache-manager/hf-hub-client")
                .build()
                .expect("reqwest client construction must not fail"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resolve_base_url: resolve_base_url.into().trim_end_matches('/').to_string(),
            signer,
        }
    }

    fn blob_directory_name(repo_id: &str) -> String {
        format!("models--{}", repo_id.replace('/', "--"))
    }
}

#[async_trait]
impl ManifestClient for HfHubClient {
    #[instrument(skip(self))]
    async fn fetch_identity(&self, chute_id: &str) -> Result<RepoIdentity, CacheError> {
        let url = format!("{}/chutes/{}/hf_info", self.base_url, chute_id);
        let mut request = self.metadata.get(&url);

        if let Some(signer) = &self.signer {
            let headers = signer.sign(OUTBOUND_SIGNING_PURPOSE, None);
            request = request
                .header("X-Hotkey", headers.hotkey)
                .header("X-Nonce", headers.nonce)
                .header("X-Signature", headers.signature);
        }

        let response = request.send().await.map_err(|err| from_reqwest("hf_info", err))?;
        if !response.status().is_success() {
            return Err(CacheError::UpstreamUnavailable(format!("hf_info returned HTTP_{}", response.status())));
        }

        let body: HfInfoResponse = response
            .json()
            .await
            .map_err(|err| CacheError::UpstreamUnavailable(format!("hf_info decoding failed: {err}")))?;

        Ok(RepoIdentity { repo_id: body.repo_id, revision: body.revision.unwrap_or_else(|| "main".to_string()) })
    }

    #[instrument(skip(self))]
    async fn fetch_manifest(&self, repo_id: &str, revision: &str) -> Result<RepoManifest, CacheError> {
        let url = format!("{}/misc/hf_repo_info", self.base_url);
        let response = self
            .metadata
            .get(&url)
            .query(&[("repo_id", repo_id), ("repo_type", "model"), ("revision", revision)])
            .send()
            .await
            .map_err(|err| from_reqwest("hf_repo_info", err))?;

        if !response.status().is_success() {
            return Err(CacheError::UpstreamUnavailable(format!("hf_repo_info returned HTTP_{}", response.status())));
        }

        let body: HfRepoInfoResponse = response
            .json()
            .await
            .map_err(|err| CacheError::UpstreamUnavailable(format!("hf_repo_info decoding failed: {err}")))?;

        Ok(RepoManifest { files: body.files })
    }
}

#[async_trait]
impl SnapshotDownloader for HfHubClient {
    #[instrument(skip(self, hub_path))]
    async fn download(&self, repo_id: &str, revision: &str, hub_path: &Path) -> Result<PathBuf, CacheError> {
        let manifest = ManifestClient::fetch_manifest(self, repo_id, revision).await?;

        let repo_dir = hub_path.join(Self::blob_directory_name(repo_id));
        let blobs_dir = repo_dir.join("blobs");
        let snapshot_dir = repo_dir.join("snapshots").join(revision);
        tokio::fs::create_dir_all(&blobs_dir)
            .await
            .map_err(|err| CacheError::Internal(format!("could not create blob directory: {err}")))?;
        tokio::fs::create_dir_all(&snapshot_dir)
            .await
            .map_err(|err| CacheError::Internal(format!("could not create snapshot directory: {err}")))?;

        for file in &manifest.files {
            if file.path.starts_with('_') {
                continue;
            }
            self.download_one_file(repo_id, revision, file, &blobs_dir, &snapshot_dir).await?;
        }

        Ok(snapshot_dir)
    }
}

impl HfHubClient {
    async fn download_one_file(
        &self,
        repo_id: &str,
        revision: &str,
        file: &chutes_cache_core::ManifestFileEntry,
        blobs_dir: &Path,
        snapshot_dir: &Path,
    ) -> Result<(), CacheError> {
        let resolve_url = format!("{}/{}/resolve/{}/{}", self.resolve_base_url, repo_id, revision, file.path);
        let response = self
            .download
            .get(&resolve_url)
            .send()
            .await
            .map_err(|err| from_reqwest("snapshot download", err))?;

        if !response.status().is_success() {
            return Err(CacheError::UpstreamUnavailable(format!(
                "downloading {} returned HTTP_{}",
                file.path,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| from_reqwest("snapshot download body", err))?;

        let digest = file.sha256.clone().or_else(|| file.blob_id.clone()).unwrap_or_else(|| {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            hex::encode(hasher.finalize())
        });

        let blob_path = blobs_dir.join(&digest);
        if !tokio::fs::try_exists(&blob_path).await.unwrap_or(false) {
            tokio::fs::write(&blob_path, &bytes)
                .await
                .map_err(|err| CacheError::Internal(format!("could not write blob {digest}: {err}")))?;
        }

        let link_path = snapshot_dir.join(&file.path);
        if let Some(parent) = link_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| CacheError::Internal(format!("could not create snapshot subdirectory: {err}")))?;
        }
        let _ = tokio::fs::remove_file(&link_path).await;
        if let Err(err) = std::os::unix::fs::symlink(&blob_path, &link_path) {
            warn!(path = %file.path, error = %err, "could not symlink snapshot file to blob, falling back to copy");
            tokio::fs::copy(&blob_path, &link_path)
                .await
                .map_err(|err| CacheError::Internal(format!("could not materialize {}: {err}", file.path)))?;
        }

        Ok(())
    }
}
