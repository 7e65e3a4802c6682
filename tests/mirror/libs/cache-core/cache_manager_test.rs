// [tests/mirror/libs/cache-core/cache_manager_test.rs]
//! Integracion de extremo a extremo del gestor de cache: descarga hasta
//! `PRESENT`, reconciliacion de un directorio preexistente, y los
//! invariantes de exclusividad de marcador y de limpieza.

use std::os::unix::fs::symlink;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chutes_cache_core::{CacheError, CacheManager, DownloadOutcomeStatus, ManifestClient, RepoIdentity, RepoManifest, SnapshotDownloader, Status};
use chutes_cache_core::model::ManifestFileEntry;

struct StaticDownloader;

#[async_trait]
impl SnapshotDownloader for StaticDownloader {
    async fn download(&self, repo_id: &str, revision: &str, hub_path: &std::path::Path) -> Result<PathBuf, CacheError> {
        let dir_name = format!("models--{}", repo_id.replace('/', "--"));
        let snapshot_dir = hub_path.join(dir_name).join("snapshots").join(revision);
        tokio::fs::create_dir_all(&snapshot_dir).await.unwrap();
        tokio::fs::write(snapshot_dir.join("config.json"), b"{}").await.unwrap();
        Ok(snapshot_dir)
    }
}

struct FixedManifestClient {
    repo_id: String,
    revision: String,
}

#[async_trait]
impl ManifestClient for FixedManifestClient {
    async fn fetch_identity(&self, _chute_id: &str) -> Result<RepoIdentity, CacheError> {
        Ok(RepoIdentity { repo_id: self.repo_id.clone(), revision: self.revision.clone() })
    }

    async fn fetch_manifest(&self, _repo_id: &str, _revision: &str) -> Result<RepoManifest, CacheError> {
        Ok(RepoManifest {
            files: vec![ManifestFileEntry {
                path: "config.json".to_string(),
                is_lfs: false,
                sha256: None,
                blob_id: None,
                size: None,
            }],
        })
    }
}

#[tokio::test]
async fn download_then_present_writes_completion_marker() {
    let dir = tempfile::tempdir().unwrap();
    let manager = CacheManager::new(
        dir.path().to_path_buf(),
        Arc::new(StaticDownloader),
        Arc::new(FixedManifestClient { repo_id: "org/model".to_string(), revision: "main".to_string() }),
    );

    let chute_id = "00000000-0000-0000-0000-000000000001";
    let outcome = manager.download(chute_id, false).await.unwrap();
    assert_eq!(outcome, DownloadOutcomeStatus::Started);

    // Da tiempo a la tarea de fondo a completar antes de consultar de nuevo.
    for _ in 0..50 {
        let statuses = manager.download_status(Some(chute_id)).await;
        if statuses[0].status == Status::Present {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let statuses = manager.download_status(Some(chute_id)).await;
    assert_eq!(statuses[0].status, Status::Present);

    let second = manager.download(chute_id, false).await.unwrap();
    assert_eq!(second, DownloadOutcomeStatus::Present);

    let marker_content = tokio::fs::read_to_string(dir.path().join(chute_id).join(".cache_complete")).await.unwrap();
    assert_eq!(marker_content, "org/model\nmain");
}

#[tokio::test]
async fn reconcile_marks_stale_when_blob_hash_no_longer_matches_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let chute_id = "00000000-0000-0000-0000-000000000002";
    let chute_dir = dir.path().join(chute_id);
    let hub_path = chute_dir.join("hub");
    let snapshot_dir = hub_path.join("models--org--model").join("snapshots").join("abc123");
    tokio::fs::create_dir_all(&snapshot_dir).await.unwrap();

    let blobs_dir = chute_dir.join("hub").join("blobs");
    tokio::fs::create_dir_all(&blobs_dir).await.unwrap();
    let stale_digest = "c".repeat(64);
    tokio::fs::write(blobs_dir.join(&stale_digest), b"old weights").await.unwrap();
    symlink(blobs_dir.join(&stale_digest), snapshot_dir.join("model.safetensors")).unwrap();

    struct MovedRevisionClient;
    #[async_trait]
    impl ManifestClient for MovedRevisionClient {
        async fn fetch_identity(&self, _chute_id: &str) -> Result<RepoIdentity, CacheError> {
            Ok(RepoIdentity { repo_id: "org/model".to_string(), revision: "def456".to_string() })
        }
        async fn fetch_manifest(&self, _repo_id: &str, _revision: &str) -> Result<RepoManifest, CacheError> {
            Ok(RepoManifest {
                files: vec![ManifestFileEntry {
                    path: "model.safetensors".to_string(),
                    is_lfs: true,
                    sha256: Some("d".repeat(64)),
                    blob_id: None,
                    size: None,
                }],
            })
        }
    }

    let manager = CacheManager::new(dir.path().to_path_buf(), Arc::new(StaticDownloader), Arc::new(MovedRevisionClient));
    manager.sync_from_disk().await;
    manager.sync_from_disk().await;

    let statuses = manager.download_status(Some(chute_id)).await;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, Status::Stale);

    let stale_content = tokio::fs::read_to_string(chute_dir.join(".cache_stale")).await.unwrap();
    assert!(stale_content.starts_with("org/model\ndef456\nHash mismatch"));
}

#[tokio::test]
async fn downloading_twice_while_present_and_not_forced_never_relaunches() {
    let dir = tempfile::tempdir().unwrap();
    let manager = CacheManager::new(
        dir.path().to_path_buf(),
        Arc::new(StaticDownloader),
        Arc::new(FixedManifestClient { repo_id: "org/model".to_string(), revision: "main".to_string() }),
    );
    let chute_id = "00000000-0000-0000-0000-000000000003";

    manager.download(chute_id, false).await.unwrap();
    for _ in 0..50 {
        if manager.download_status(Some(chute_id)).await[0].status == Status::Present {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(manager.download(chute_id, false).await.unwrap(), DownloadOutcomeStatus::Present);
    assert_eq!(manager.download(chute_id, true).await.unwrap(), DownloadOutcomeStatus::Started);
}

#[tokio::test]
async fn cleanup_never_removes_an_in_progress_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let manager = CacheManager::new(
        dir.path().to_path_buf(),
        Arc::new(StaticDownloader),
        Arc::new(FixedManifestClient { repo_id: "org/model".to_string(), revision: "main".to_string() }),
    );
    let chute_id = "00000000-0000-0000-0000-000000000004";
    manager.download(chute_id, false).await.unwrap();

    let result = manager.cleanup(0.0, 0.0, None).await;
    assert!(!result.removed_chutes.contains(&chute_id.to_string()));
}
