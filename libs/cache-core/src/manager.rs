// [libs/cache-core/src/manager.rs]
//! `CacheManager`: el mapa `chute_id -> Snapshot`, el ciclo de vida de una
//! descarga en segundo plano, la reconciliacion con el disco compartido y
//! la limpieza por edad/tamano.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::disk_scan::{discover_chute_directories, has_model_directories, size_on_disk};
use crate::error::CacheError;
use crate::markers::{
    chmod_tree_blocking, clear_all_markers, create_shared_directory, has_complete_marker,
    has_stale_marker, write_complete_marker, write_stale_marker,
};
use crate::model::{CleanupResult, DownloadOutcomeStatus, DownloadStatusEntry, OverviewEntry, Status};
use crate::traits::{ManifestClient, SnapshotDownloader};
use crate::verify::{verify_cache, ManifestCache, VerifyError};

/// `hub/models--{org}--{repo}/snapshots/{revision}/`, donde realmente
/// aterrizan los archivos del manifiesto (no directamente bajo `hub/`).
fn snapshot_dir(hub_path: &std::path::Path, repo_id: &str, revision: &str) -> PathBuf {
    hub_path.join(format!("models--{}", repo_id.replace('/', "--"))).join("snapshots").join(revision)
}

struct SnapshotInner {
    repo_id: String,
    revision: String,
    task_handle: Option<JoinHandle<()>>,
    in_progress: bool,
    failed_error: Option<String>,
    total_bytes: u64,
    initial_bytes: u64,
    started_at: Option<Instant>,
    reconciled: bool,
    externally_managed: bool,
}

/// Un snapshot rastreado por el gestor. El propio snapshot es el unico
/// duenio de su estado mutable mientras su tarea de descarga esta viva;
/// el gestor lo toca bajo su mapa solo para insertar o eliminar la entrada.
pub struct Snapshot {
    pub chute_id: String,
    pub path: PathBuf,
    pub hub_path: PathBuf,
    inner: Mutex<SnapshotInner>,
}

impl Snapshot {
    fn new(chute_id: String, cache_base: &std::path::Path, repo_id: String, revision: String, externally_managed: bool) -> Arc<Self> {
        let path = cache_base.join(&chute_id);
        let hub_path = path.join("hub");
        Arc::new(Self {
            chute_id,
            path,
            hub_path,
            inner: Mutex::new(SnapshotInner {
                repo_id,
                revision,
                task_handle: None,
                in_progress: false,
                failed_error: None,
                total_bytes: 0,
                initial_bytes: 0,
                started_at: None,
                reconciled: false,
                externally_managed,
            }),
        })
    }
}

pub struct CacheManager {
    cache_base: PathBuf,
    snapshots: Mutex<HashMap<String, Arc<Snapshot>>>,
    downloader: Arc<dyn SnapshotDownloader>,
    manifest_client: Arc<dyn ManifestClient>,
    manifest_cache: ManifestCache,
}

impl CacheManager {
    pub fn new(
        cache_base: PathBuf,
        downloader: Arc<dyn SnapshotDownloader>,
        manifest_client: Arc<dyn ManifestClient>,
    ) -> Self {
        Self {
            cache_base,
            snapshots: Mutex::new(HashMap::new()),
            downloader,
            manifest_client,
            manifest_cache: ManifestCache::new(4096),
        }
    }

    #[instrument(skip(self), fields(chute_id = %chute_id))]
    pub async fn download(&self, chute_id: &str, force: bool) -> Result<DownloadOutcomeStatus, CacheError> {
        let existing = {
            let snapshots = self.snapshots.lock().await;
            snapshots.get(chute_id).cloned()
        };

        if let Some(snapshot) = &existing {
            let mut inner = snapshot.inner.lock().await;
            if inner.in_progress {
                return Ok(DownloadOutcomeStatus::InProgress);
            }
            if !force && has_complete_marker(&snapshot.path).await {
                return Ok(DownloadOutcomeStatus::Present);
            }
            self.launch_download(snapshot.clone(), &mut inner).await?;
            return Ok(DownloadOutcomeStatus::Started);
        }

        let identity = self
            .manifest_client
            .fetch_identity(chute_id)
            .await
            .map_err(|err| CacheError::UpstreamUnavailable(format!("could not resolve identity: {err}")))?;

        let snapshot = Snapshot::new(chute_id.to_string(), &self.cache_base, identity.repo_id, identity.revision, false);
        {
            let mut snapshots = self.snapshots.lock().await;
            snapshots.insert(chute_id.to_string(), snapshot.clone());
        }

        let mut inner = snapshot.inner.lock().await;
        self.launch_download(snapshot.clone(), &mut inner).await?;
        Ok(DownloadOutcomeStatus::Started)
    }

    /// Prepara el directorio compartido, consulta el tamano total del
    /// manifiesto (de mejor esfuerzo) y lanza la tarea de fondo.
    async fn launch_download(&self, snapshot: Arc<Snapshot>, inner: &mut SnapshotInner) -> Result<(), CacheError> {
        create_shared_directory(&snapshot.path)
            .await
            .map_err(|err| CacheError::Internal(format!("could not create snapshot directory: {err}")))?;
        create_shared_directory(&snapshot.hub_path)
            .await
            .map_err(|err| CacheError::Internal(format!("could not create hub directory: {err}")))?;

        let total_bytes = self
            .manifest_client
            .fetch_manifest(&inner.repo_id, &inner.revision)
            .await
            .map(|manifest| manifest.total_size_bytes())
            .unwrap_or(0);
        let initial_bytes = size_on_disk(&snapshot.hub_path).await.unwrap_or(0);

        inner.total_bytes = total_bytes;
        inner.initial_bytes = initial_bytes;
        inner.started_at = Some(Instant::now());
        inner.in_progress = true;
        inner.failed_error = None;

        let repo_id = inner.repo_id.clone();
        let revision = inner.revision.clone();
        let downloader = self.downloader.clone();
        let manifest_client = self.manifest_client.clone();
        let manifest_cache = self.manifest_cache.clone();
        let snapshot_for_task = snapshot.clone();

        let handle = tokio::spawn(async move {
            let outcome = run_download_task(
                downloader.as_ref(),
                manifest_client.as_ref(),
                &manifest_cache,
                &repo_id,
                &revision,
                &snapshot_for_task.path,
                &snapshot_for_task.hub_path,
            )
            .await;

            if let Err(err) = &outcome {
                warn!(chute_id = %snapshot_for_task.chute_id, error = %err, "download task failed, removing snapshot directory");
                let _ = tokio::fs::remove_dir_all(&snapshot_for_task.path).await;
            }

            let mut inner = snapshot_for_task.inner.lock().await;
            inner.in_progress = false;
            inner.failed_error = outcome.err();
        });

        inner.task_handle = Some(handle);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn download_status(&self, chute_id: Option<&str>) -> Vec<DownloadStatusEntry> {
        let snapshots: Vec<Arc<Snapshot>> = {
            let map = self.snapshots.lock().await;
            match chute_id {
                Some(id) => map.get(id).cloned().into_iter().collect(),
                None => map.values().cloned().collect(),
            }
        };

        let mut entries = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            entries.push(self.status_entry(&snapshot).await);
        }
        entries
    }

    async fn status_entry(&self, snapshot: &Arc<Snapshot>) -> DownloadStatusEntry {
        let status = self.derive_status(snapshot).await;
        let inner = snapshot.inner.lock().await;
        let current_bytes = size_on_disk(&snapshot.hub_path).await.unwrap_or(0);

        let (percent, rate, eta) = match (inner.started_at, inner.total_bytes) {
            (Some(started_at), total) if total > 0 => {
                let elapsed = started_at.elapsed().as_secs_f64().max(0.001);
                let downloaded = current_bytes.saturating_sub(inner.initial_bytes) as f64;
                let rate = downloaded / elapsed;
                let percent = (current_bytes as f64 / total as f64 * 100.0).min(100.0);
                let remaining = (total.saturating_sub(current_bytes)) as f64;
                let eta = if rate > 0.0 { Some(remaining / rate) } else { None };
                (Some(percent), if rate > 0.0 { Some(rate) } else { None }, eta)
            }
            _ => (None, None, None),
        };

        DownloadStatusEntry {
            chute_id: snapshot.chute_id.clone(),
            repo_id: inner.repo_id.clone(),
            revision: inner.revision.clone(),
            status,
            percent,
            bytes_downloaded: current_bytes,
            total_bytes: if inner.total_bytes > 0 { Some(inner.total_bytes) } else { None },
            rate_bytes_per_sec: rate,
            eta_seconds: eta,
            error: inner.failed_error.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, chute_id: &str, force: bool) -> Result<(), CacheError> {
        let snapshot = {
            let mut map = self.snapshots.lock().await;
            map.remove(chute_id)
        };

        let Some(snapshot) = snapshot else {
            return Err(CacheError::InvalidRequest(format!("unknown chute {chute_id}")));
        };

        let mut inner = snapshot.inner.lock().await;
        if inner.in_progress && !force {
            let mut map = self.snapshots.lock().await;
            map.insert(chute_id.to_string(), snapshot.clone());
            return Err(CacheError::Conflict(format!("download for {chute_id} is in progress")));
        }
        if let Some(handle) = inner.task_handle.take() {
            handle.abort();
        }
        drop(inner);

        tokio::fs::remove_dir_all(&snapshot.path)
            .await
            .or_else(|err| if err.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(err) })
            .map_err(|err| CacheError::Internal(format!("could not remove {chute_id}: {err}")))
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> (Vec<OverviewEntry>, u64) {
        let snapshots: Vec<Arc<Snapshot>> = self.snapshots.lock().await.values().cloned().collect();
        let mut entries = Vec::with_capacity(snapshots.len());
        let mut total_size = 0u64;

        for snapshot in &snapshots {
            let status = self.derive_status(snapshot).await;
            let size_bytes = size_on_disk(&snapshot.path).await.unwrap_or(0);
            total_size += size_bytes;
            let last_accessed = last_access_time(&snapshot.path).await;
            let inner = snapshot.inner.lock().await;
            entries.push(OverviewEntry {
                chute_id: snapshot.chute_id.clone(),
                repo_id: inner.repo_id.clone(),
                revision: inner.revision.clone(),
                size_bytes,
                last_accessed,
                status,
            });
        }

        (entries, total_size)
    }

    #[instrument(skip(self))]
    pub async fn cleanup(&self, max_age_days: f64, max_size_gb: f64, exclude_pattern: Option<&str>) -> CleanupResult {
        let exclude_pattern = exclude_pattern.map(|pattern| pattern.to_lowercase());
        let snapshots: Vec<Arc<Snapshot>> = self.snapshots.lock().await.values().cloned().collect();

        let mut candidates = Vec::new();
        for snapshot in snapshots {
            let inner = snapshot.inner.lock().await;
            if inner.in_progress {
                continue;
            }
            if let Some(pattern) = &exclude_pattern {
                if inner.repo_id.to_lowercase().contains(pattern.as_str()) {
                    continue;
                }
            }
            drop(inner);
            let size_bytes = size_on_disk(&snapshot.path).await.unwrap_or(0);
            if size_bytes == 0 {
                continue;
            }
            let last_accessed = last_access_time(&snapshot.path).await;
            candidates.push((snapshot, size_bytes, last_accessed));
        }

        let max_age = chrono::Duration::seconds((max_age_days * 86_400.0) as i64);
        let age_cutoff = chrono::Utc::now() - max_age;

        let mut result = CleanupResult::default();
        let mut remaining = Vec::new();
        for (snapshot, size_bytes, last_accessed) in candidates {
            if last_accessed < age_cutoff {
                self.evict(&snapshot).await;
                result.freed_bytes += size_bytes;
                result.removed_chutes.push(snapshot.chute_id.clone());
            } else {
                remaining.push((snapshot, size_bytes));
            }
        }

        let max_size_bytes = (max_size_gb * 1024.0 * 1024.0 * 1024.0) as u64;
        let mut total_remaining: u64 = remaining.iter().map(|(_, size)| size).sum();
        if total_remaining > max_size_bytes {
            remaining.sort_by(|a, b| b.1.cmp(&a.1));
            for (snapshot, size_bytes) in remaining {
                if total_remaining <= max_size_bytes {
                    break;
                }
                self.evict(&snapshot).await;
                total_remaining = total_remaining.saturating_sub(size_bytes);
                result.freed_bytes += size_bytes;
                result.removed_chutes.push(snapshot.chute_id.clone());
            }
        }

        info!(freed_bytes = result.freed_bytes, removed = result.removed_chutes.len(), "cache cleanup complete");
        result
    }

    async fn evict(&self, snapshot: &Arc<Snapshot>) {
        self.snapshots.lock().await.remove(&snapshot.chute_id);
        let _ = tokio::fs::remove_dir_all(&snapshot.path).await;
    }

    #[instrument(skip(self))]
    pub async fn sync_from_disk(&self) {
        if let Ok(discovered) = discover_chute_directories(&self.cache_base).await {
            for chute_id in discovered {
                let already_tracked = self.snapshots.lock().await.contains_key(&chute_id);
                if already_tracked {
                    continue;
                }
                let hub_path = self.cache_base.join(&chute_id).join("hub");
                if !has_model_directories(&hub_path).await {
                    continue;
                }
                let Ok(identity) = self.manifest_client.fetch_identity(&chute_id).await else {
                    continue;
                };
                let snapshot = Snapshot::new(chute_id.clone(), &self.cache_base, identity.repo_id, identity.revision, true);
                self.snapshots.lock().await.insert(chute_id, snapshot);
            }
        }

        let snapshots: Vec<Arc<Snapshot>> = self.snapshots.lock().await.values().cloned().collect();
        for snapshot in snapshots {
            if self.needs_reconciliation(&snapshot).await {
                self.reconcile(&snapshot).await;
            }
        }
    }

    async fn needs_reconciliation(&self, snapshot: &Arc<Snapshot>) -> bool {
        let inner = snapshot.inner.lock().await;
        if inner.reconciled || inner.in_progress {
            return false;
        }
        drop(inner);
        tokio::fs::try_exists(&snapshot.path).await.unwrap_or(false)
    }

    #[instrument(skip(self, snapshot), fields(chute_id = %snapshot.chute_id))]
    pub async fn reconcile(&self, snapshot: &Arc<Snapshot>) {
        if !tokio::fs::try_exists(&snapshot.path).await.unwrap_or(false) {
            snapshot.inner.lock().await.reconciled = true;
            return;
        }

        let identity = match self.manifest_client.fetch_identity(&snapshot.chute_id).await {
            Ok(identity) => identity,
            Err(_) => {
                snapshot.inner.lock().await.reconciled = false;
                return;
            }
        };

        {
            let mut inner = snapshot.inner.lock().await;
            inner.repo_id = identity.repo_id.clone();
            inner.revision = identity.revision.clone();
        }
        let _ = clear_all_markers(&snapshot.path).await;

        let result = verify_cache(
            self.manifest_client.as_ref(),
            &self.manifest_cache,
            &identity.repo_id,
            &identity.revision,
            &snapshot_dir(&snapshot.hub_path, &identity.repo_id, &identity.revision),
        )
        .await;

        let mut inner = snapshot.inner.lock().await;
        match result {
            Ok(()) => {
                drop(inner);
                let _ = write_complete_marker(&snapshot.path, &identity.repo_id, &identity.revision).await;
                snapshot.inner.lock().await.reconciled = true;
            }
            Err(VerifyError::MissingFile(_)) => {
                inner.reconciled = false;
            }
            Err(VerifyError::ManifestUnreachable { .. }) => {
                inner.reconciled = false;
            }
            Err(mismatch @ (VerifyError::SizeMismatch(_) | VerifyError::HashMismatch(_))) => {
                drop(inner);
                let _ = write_stale_marker(&snapshot.path, &identity.repo_id, &identity.revision, &mismatch.to_string()).await;
                snapshot.inner.lock().await.reconciled = true;
            }
        }
    }

    async fn derive_status(&self, snapshot: &Arc<Snapshot>) -> Status {
        {
            let inner = snapshot.inner.lock().await;
            if inner.in_progress {
                return Status::InProgress;
            }
            if inner.failed_error.is_some() {
                return Status::Failed;
            }
        }
        if has_complete_marker(&snapshot.path).await {
            return Status::Present;
        }
        if has_stale_marker(&snapshot.path).await {
            return Status::Stale;
        }
        if has_model_directories(&snapshot.hub_path).await {
            return Status::Incomplete;
        }
        Status::Missing
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_download_task(
    downloader: &dyn SnapshotDownloader,
    manifest_client: &dyn ManifestClient,
    manifest_cache: &ManifestCache,
    repo_id: &str,
    revision: &str,
    snapshot_path: &std::path::Path,
    hub_path: &std::path::Path,
) -> Result<(), String> {
    downloader
        .download(repo_id, revision, hub_path)
        .await
        .map_err(|err| err.to_string())?;

    verify_cache(manifest_client, manifest_cache, repo_id, revision, &snapshot_dir(hub_path, repo_id, revision))
        .await
        .map_err(|err| err.to_string())?;

    let chmod_target = snapshot_path.to_path_buf();
    tokio::task::spawn_blocking(move || chmod_tree_blocking(&chmod_target))
        .await
        .map_err(|err| format!("chmod task panicked: {err}"))?
        .map_err(|err| format!("could not chmod snapshot tree: {err}"))?;

    write_complete_marker(snapshot_path, repo_id, revision)
        .await
        .map_err(|err| format!("could not write completion marker: {err}"))
}

async fn last_access_time(path: &std::path::Path) -> chrono::DateTime<chrono::Utc> {
    match tokio::fs::metadata(path).await.and_then(|metadata| metadata.accessed()) {
        Ok(system_time) => chrono::DateTime::<chrono::Utc>::from(system_time),
        Err(_) => chrono::Utc::now(),
    }
}
