// [tests/mirror/libs/cache-core/verify_cache_test.rs]
//! Verificacion de snapshot contra manifiesto remoto, ejercitada como caja
//! negra a traves de la API publica del crate.

use std::os::unix::fs::symlink;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chutes_cache_core::model::ManifestFileEntry;
use chutes_cache_core::{verify_cache, CacheError, ManifestCache, ManifestClient, RepoIdentity, RepoManifest, VerifyError};

struct CountingManifestClient {
    manifest: RepoManifest,
    calls: AtomicUsize,
}

#[async_trait]
impl ManifestClient for CountingManifestClient {
    async fn fetch_identity(&self, _chute_id: &str) -> Result<RepoIdentity, CacheError> {
        unreachable!("verify_cache never fetches identity")
    }

    async fn fetch_manifest(&self, _repo_id: &str, _revision: &str) -> Result<RepoManifest, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.manifest.clone())
    }
}

#[tokio::test]
async fn detects_size_mismatch_against_the_blob_target() {
    let dir = tempfile::tempdir().unwrap();
    let blobs_dir = dir.path().join("blobs");
    std::fs::create_dir_all(&blobs_dir).unwrap();
    let digest = "e".repeat(64);
    std::fs::write(blobs_dir.join(&digest), vec![0u8; 5]).unwrap();
    symlink(blobs_dir.join(&digest), dir.path().join("weights.bin")).unwrap();

    let manifest = RepoManifest {
        files: vec![ManifestFileEntry {
            path: "weights.bin".to_string(),
            is_lfs: true,
            sha256: Some(digest),
            blob_id: None,
            size: Some(999),
        }],
    };
    let client = CountingManifestClient { manifest, calls: AtomicUsize::new(0) };
    let cache = ManifestCache::new(16);

    let result = verify_cache(&client, &cache, "org/model", "main", dir.path()).await;
    assert!(matches!(result, Err(VerifyError::SizeMismatch(_))));
}

#[tokio::test]
async fn different_revisions_of_the_same_repo_are_cached_independently() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = RepoManifest { files: vec![] };
    let client = CountingManifestClient { manifest, calls: AtomicUsize::new(0) };
    let cache = ManifestCache::new(16);

    verify_cache(&client, &cache, "org/model", "main", dir.path()).await.unwrap();
    verify_cache(&client, &cache, "org/model", "other-revision", dir.path()).await.unwrap();
    verify_cache(&client, &cache, "org/model", "main", dir.path()).await.unwrap();

    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_manifest_is_reported_distinctly_from_content_mismatches() {
    struct FailingClient;
    #[async_trait]
    impl ManifestClient for FailingClient {
        async fn fetch_identity(&self, _chute_id: &str) -> Result<RepoIdentity, CacheError> {
            unreachable!()
        }
        async fn fetch_manifest(&self, _repo_id: &str, _revision: &str) -> Result<RepoManifest, CacheError> {
            Err(CacheError::UpstreamUnavailable("connection refused".to_string()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let cache = ManifestCache::new(16);
    let result = verify_cache(&FailingClient, &cache, "org/model", "main", dir.path()).await;
    assert!(matches!(result, Err(VerifyError::ManifestUnreachable { .. })));
}
