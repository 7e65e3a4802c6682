// [tests/mirror/apps/cache-manager/cache_manager_http_test.rs]
//! Ejercita el router completo del gestor de cache via HTTP real, firmando
//! las peticiones con el mismo contrato SR25519 que usa un minero.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chutes_auth::{sha256_hex, AuthGuardState, AuthorizeOptions, SignedRequestAuthenticator};
use chutes_cache_core::{CacheError, CacheManager, ManifestClient, RepoIdentity, RepoManifest, SnapshotDownloader};
use chutes_cache_manager::{build_router, AppState};
use schnorrkel::{signing_context, Keypair};
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct InstantDownloader;

#[async_trait]
impl SnapshotDownloader for InstantDownloader {
    async fn download(&self, _repo_id: &str, revision: &str, hub_path: &Path) -> Result<PathBuf, CacheError> {
        let snapshot_dir = hub_path.join("models--org--model").join("snapshots").join(revision);
        tokio::fs::create_dir_all(&snapshot_dir).await.unwrap();
        Ok(snapshot_dir)
    }
}

#[async_trait]
impl ManifestClient for InstantDownloader {
    async fn fetch_identity(&self, chute_id: &str) -> Result<RepoIdentity, CacheError> {
        Ok(RepoIdentity { repo_id: format!("org/{chute_id}"), revision: "main".to_string() })
    }

    async fn fetch_manifest(&self, _repo_id: &str, _revision: &str) -> Result<RepoManifest, CacheError> {
        Ok(RepoManifest { files: Vec::new() })
    }
}

fn address_and_keypair() -> (String, Keypair) {
    let keypair = Keypair::generate();
    let mut raw = vec![42u8];
    raw.extend_from_slice(&keypair.public.to_bytes());
    (bs58::encode(raw).with_check().into_string(), keypair)
}

fn sign(keypair: &Keypair, hotkey: &str, nonce: &str, payload_hash: &str) -> String {
    let signing_string = format!("{hotkey}:{nonce}:{payload_hash}");
    let signature = keypair.sign(signing_context(b"substrate").bytes(signing_string.as_bytes()));
    hex::encode(signature.to_bytes())
}

fn nonce_now() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .to_string()
}

async fn spawn_cache_manager() -> (String, String, Keypair) {
    let dir = tempfile::tempdir().unwrap();
    let downloader = Arc::new(InstantDownloader);
    let cache_manager = Arc::new(CacheManager::new(dir.path().to_path_buf(), downloader.clone(), downloader));

    let (miner_hotkey, miner_keypair) = address_and_keypair();
    let authenticator = Arc::new(SignedRequestAuthenticator::new(miner_hotkey.clone(), HashSet::new()));
    let auth_guard = AuthGuardState {
        authenticator,
        options: AuthorizeOptions { allow_miner: true, allow_validator: false, purpose: "cache" },
    };

    let state = AppState { cache_manager, auth_guard };
    let router = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), miner_hotkey, miner_keypair)
}

fn signed_headers(hotkey: &str, keypair: &Keypair, payload_hash: &str) -> (String, String, String) {
    let nonce = nonce_now();
    let signature = sign(keypair, hotkey, &nonce, payload_hash);
    (hotkey.to_string(), nonce, signature)
}

#[tokio::test]
async fn download_then_overview_reports_present_chute() {
    let (base_url, hotkey, keypair) = spawn_cache_manager().await;
    let client = reqwest::Client::new();

    let body = json!({"chute_id": "chute-1"});
    let body_bytes = serde_json::to_vec(&body).unwrap();
    let (hk, nonce, signature) = signed_headers(&hotkey, &keypair, &sha256_hex(&body_bytes));

    let response = client
        .post(format!("{base_url}/cache/download"))
        .header("X-Hotkey", hk)
        .header("X-Nonce", nonce)
        .header("X-Signature", signature)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    for _ in 0..50 {
        let (hk, nonce, signature) = signed_headers(&hotkey, &keypair, "cache");
        let overview: Value = client
            .get(format!("{base_url}/cache/overview"))
            .header("X-Hotkey", hk)
            .header("X-Nonce", nonce)
            .header("X-Signature", signature)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if overview["chutes"].as_array().map(|arr| !arr.is_empty()).unwrap_or(false) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("chute never appeared in overview");
}

#[tokio::test]
async fn request_without_signature_headers_is_rejected() {
    let (base_url, _hotkey, _keypair) = spawn_cache_manager().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base_url}/cache/overview"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn deleting_an_unknown_chute_is_an_invalid_request() {
    let (base_url, hotkey, keypair) = spawn_cache_manager().await;
    let client = reqwest::Client::new();

    let (hk, nonce, signature) = signed_headers(&hotkey, &keypair, "cache");
    let response = client
        .delete(format!("{base_url}/cache/missing-chute"))
        .header("X-Hotkey", hk)
        .header("X-Nonce", nonce)
        .header("X-Signature", signature)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
