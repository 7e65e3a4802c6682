// [apps/cache-manager/src/routes.rs]
/*!
 * APARATO: CACHE MANAGER ROUTER (ESTRATO L1-APP)
 * RESPONSABILIDAD: ENDPOINTS HTTP DEL GESTOR DE CACHE, TODOS TRAS FIRMA
 */

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chutes_auth::signed_request_guard;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/cache/download", post(start_download))
        .route("/cache/download/status", get(download_status))
        .route("/cache/{chute_id}", delete(delete_chute))
        .route("/cache/cleanup", post(cleanup))
        .route("/cache/overview", get(overview))
        .route_layer(middleware::from_fn_with_state(state.clone(), signed_request_guard));

    Router::new()
        .merge(protected)
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct DownloadRequest {
    chute_id: String,
}

#[derive(Deserialize)]
struct ForceQuery {
    #[serde(default)]
    force: bool,
}

async fn start_download(
    State(state): State<AppState>,
    Query(query): Query<ForceQuery>,
    Json(body): Json<DownloadRequest>,
) -> impl IntoResponse {
    match state.cache_manager.download(&body.chute_id, query.force).await {
        Ok(status) => Json(json!({ "chute_id": body.chute_id, "status": status })).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Deserialize)]
struct StatusQuery {
    chute_id: Option<String>,
}

async fn download_status(State(state): State<AppState>, Query(query): Query<StatusQuery>) -> impl IntoResponse {
    state.cache_manager.sync_from_disk().await;
    let entries = state.cache_manager.download_status(query.chute_id.as_deref()).await;
    Json(entries)
}

async fn delete_chute(State(state): State<AppState>, Path(chute_id): Path<String>, Query(query): Query<ForceQuery>) -> impl IntoResponse {
    match state.cache_manager.delete(&chute_id, query.force).await {
        Ok(()) => Json(json!({ "status": "deleted", "message": format!("{chute_id} removed") })).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Deserialize)]
struct CleanupRequest {
    max_age_days: f64,
    max_size_gb: f64,
    #[serde(default)]
    exclude_pattern: Option<String>,
}

async fn cleanup(State(state): State<AppState>, Json(body): Json<CleanupRequest>) -> impl IntoResponse {
    let result = state
        .cache_manager
        .cleanup(body.max_age_days, body.max_size_gb, body.exclude_pattern.as_deref())
        .await;
    Json(result)
}

#[derive(Serialize)]
struct OverviewResponse {
    total_size_bytes: u64,
    chutes: Vec<chutes_cache_core::OverviewEntry>,
}

async fn overview(State(state): State<AppState>) -> impl IntoResponse {
    state.cache_manager.sync_from_disk().await;
    let (chutes, total_size_bytes) = state.cache_manager.overview().await;
    Json(OverviewResponse { total_size_bytes, chutes })
}

/// Metricas ligeras, sin registro Prometheus propio: solo cuenta de
/// entradas por estado, ya que el gestor de cache no mantiene contadores
/// acumulativos separados del estado derivado en memoria.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.cache_manager.download_status(None).await;
    let mut by_status: HashMap<&'static str, u64> = HashMap::new();
    for entry in &entries {
        let label = match entry.status {
            chutes_cache_core::Status::InProgress => "in_progress",
            chutes_cache_core::Status::Failed => "failed",
            chutes_cache_core::Status::Present => "present",
            chutes_cache_core::Status::Stale => "stale",
            chutes_cache_core::Status::Incomplete => "incomplete",
            chutes_cache_core::Status::Missing => "missing",
        };
        *by_status.entry(label).or_insert(0) += 1;
    }

    let mut buffer = String::new();
    for (label, count) in &by_status {
        buffer.push_str(&format!("chutes_cache_snapshots{{status=\"{label}\"}} {count}\n"));
    }

    ([("content-type", "text/plain; version=0.0.4")], buffer)
}
