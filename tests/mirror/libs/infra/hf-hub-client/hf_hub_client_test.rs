// [tests/mirror/libs/infra/hf-hub-client/hf_hub_client_test.rs]
//! Ejercita `HfHubClient` contra un servidor axum desechable que imita el
//! servicio de manifiestos y el endpoint `resolve` de Hugging Face Hub.

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use chutes_cache_core::{ManifestClient, SnapshotDownloader};
use chutes_hf_hub_client::HfHubClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_fake_hub(hf_info: Value, repo_info: Value, file_contents: &'static str) -> String {
    let app = Router::new()
        .route(
            "/chutes/{chute_id}/hf_info",
            get(move || {
                let hf_info = hf_info.clone();
                async move { Json(hf_info) }
            }),
        )
        .route(
            "/misc/hf_repo_info",
            get(move |Query(_params): Query<HashMap<String, String>>| {
                let repo_info = repo_info.clone();
                async move { Json(repo_info) }
            }),
        )
        .route(
            "/org/model/resolve/main/config.json",
            get(move || async move { file_contents }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_identity_resolves_repo_and_defaults_revision_to_main() {
    let base_url = spawn_fake_hub(json!({"repo_id": "org/model"}), json!({"files": []}), "").await;
    let client = HfHubClient::new(base_url.clone(), base_url, None);

    let identity = client.fetch_identity("chute-1").await.unwrap();
    assert_eq!(identity.repo_id, "org/model");
    assert_eq!(identity.revision, "main");
}

#[tokio::test]
async fn fetch_manifest_returns_the_file_list() {
    let repo_info = json!({"files": [{"path": "config.json", "is_lfs": false, "size": 13}]});
    let base_url = spawn_fake_hub(json!({"repo_id": "org/model"}), repo_info, "").await;
    let client = HfHubClient::new(base_url.clone(), base_url, None);

    let manifest = client.fetch_manifest("org/model", "main").await.unwrap();
    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.files[0].path, "config.json");
}

#[tokio::test]
async fn download_materializes_snapshot_tree_with_blob_symlinks() {
    let contents = "{\"hidden_size\": 4096}";
    let repo_info = json!({"files": [{"path": "config.json", "is_lfs": false, "size": contents.len()}]});
    let base_url = spawn_fake_hub(json!({"repo_id": "org/model"}), repo_info, contents).await;
    let client = Arc::new(HfHubClient::new(base_url.clone(), base_url, None));

    let dir = tempfile::tempdir().unwrap();
    let snapshot_dir = client.download("org/model", "main", dir.path()).await.unwrap();

    let materialized = tokio::fs::read_to_string(snapshot_dir.join("config.json")).await.unwrap();
    assert_eq!(materialized, contents);

    let blobs_dir = dir.path().join("models--org--model").join("blobs");
    let mut entries = tokio::fs::read_dir(&blobs_dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_some());
}
